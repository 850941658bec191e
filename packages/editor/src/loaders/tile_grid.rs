use super::{enum_value, required_str};
use crate::context::LoaderContext;
use crate::errors::LoadError;
use crate::node::{BlendMode, NodeKind, NodeRef, TileCell, TileGrid, TileLayer};
use crate::types::{NodeLoader, Progress};
use scened_common::normalize_resource_path;
use scened_parser::Message;

/// `.tilegrid` documents: a tile set and z-ordered layers of cells
pub struct TileGridLoader;

impl NodeLoader for TileGridLoader {
    fn load(&self, _ctx: &LoaderContext, message: &Message) -> Result<NodeRef, LoadError> {
        let blend_mode = match enum_value(message, "blend_mode") {
            Some(text) => BlendMode::parse(text).ok_or_else(|| {
                LoadError::invalid_field("blend_mode", format!("unknown blend mode '{}'", text))
            })?,
            None => BlendMode::default(),
        };
        let tile_set = match message.get_str("tile_set") {
            Some(path) if !path.is_empty() => normalize_resource_path(path),
            _ => String::new(),
        };

        let grid = NodeRef::new(NodeKind::TileGrid(TileGrid {
            tile_set,
            blend_mode,
        }));

        for entry in message.messages("layers") {
            let cells = entry
                .messages("cell")
                .map(|cell| TileCell {
                    x: cell.get_i64("x").unwrap_or(0),
                    y: cell.get_i64("y").unwrap_or(0),
                    tile: cell.get_i64("tile").unwrap_or(0),
                    h_flip: cell.get_bool("h_flip").unwrap_or(false),
                    v_flip: cell.get_bool("v_flip").unwrap_or(false),
                })
                .collect();
            let layer = NodeRef::new(NodeKind::TileLayer(TileLayer {
                id: required_str(entry, "id", "layers")?,
                z: entry.get_f64("z").unwrap_or(0.0),
                visible: entry.get_bool("is_visible").unwrap_or(true),
                cells,
            }));
            grid.attach(&layer, None);
        }

        Ok(grid)
    }

    fn build_message(
        &self,
        _ctx: &LoaderContext,
        node: &NodeRef,
        progress: &Progress,
    ) -> Result<Message, LoadError> {
        let grid = match node.borrow().kind() {
            NodeKind::TileGrid(grid) => grid.clone(),
            other => {
                return Err(LoadError::WrongKind {
                    path: "tile grid".into(),
                    found: other.name(),
                    expected: "tile_grid".into(),
                })
            }
        };

        let mut message = Message::new().with_str("tile_set", grid.tile_set);
        message.push_ident("blend_mode", grid.blend_mode.as_str());

        for child in node.children() {
            progress.check()?;
            let child = child.borrow();
            let NodeKind::TileLayer(layer) = child.kind() else {
                continue;
            };

            let mut entry = Message::new().with_str("id", layer.id.as_str()).with_f64("z", layer.z);
            entry.push_i64("is_visible", i64::from(layer.visible));
            for cell in &layer.cells {
                let mut c = Message::new();
                c.push_i64("x", cell.x);
                c.push_i64("y", cell.y);
                c.push_i64("tile", cell.tile);
                c.push_i64("h_flip", i64::from(cell.h_flip));
                c.push_i64("v_flip", i64::from(cell.v_flip));
                entry.push_message("cell", c);
            }
            message.push_message("layers", entry);
        }

        Ok(message)
    }
}
