//! Node kinds and their payloads

use crate::script::ScriptProperty;
use indexmap::IndexMap;
use std::fmt;
use std::rc::Rc;

/// Per-instance property overrides: target component, then property id, then value text
pub type Overrides = IndexMap<OverrideKey, IndexMap<String, String>>;

/// Component an override table applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverrideKey {
    /// Id path of the game object inside a collection instance
    pub instance: Option<String>,
    pub component: String,
}

impl OverrideKey {
    /// Component of a game object instance
    pub fn component(component: impl Into<String>) -> Self {
        Self {
            instance: None,
            component: component.into(),
        }
    }

    /// Component of a game object inside a collection instance
    pub fn nested(instance: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            instance: Some(instance.into()),
            component: component.into(),
        }
    }
}

impl fmt::Display for OverrideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}.{}", instance, self.component),
            None => f.write_str(&self.component),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Collection(Collection),
    GameObject(GameObject),
    GameObjectInstance(GameObjectInstance),
    CollectionInstance(CollectionInstance),
    ComponentRef(ComponentRef),
    CollisionShape(CollisionShape),
    TileGrid(TileGrid),
    TileLayer(TileLayer),
}

impl NodeKind {
    /// Registry key of the kind
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Collection(_) => kinds::COLLECTION,
            NodeKind::GameObject(_) => kinds::GAME_OBJECT,
            NodeKind::GameObjectInstance(_) => kinds::GAME_OBJECT_INSTANCE,
            NodeKind::CollectionInstance(_) => kinds::COLLECTION_INSTANCE,
            NodeKind::ComponentRef(_) => kinds::COMPONENT,
            NodeKind::CollisionShape(_) => kinds::COLLISION_SHAPE,
            NodeKind::TileGrid(_) => kinds::TILE_GRID,
            NodeKind::TileLayer(_) => kinds::TILE_LAYER,
        }
    }

    /// Identifier among siblings, for kinds that have one
    pub fn id(&self) -> Option<&str> {
        match self {
            NodeKind::GameObject(go) => go.id.as_deref(),
            NodeKind::GameObjectInstance(i) => Some(&i.id),
            NodeKind::CollectionInstance(i) => Some(&i.id),
            NodeKind::ComponentRef(c) => Some(&c.id),
            NodeKind::CollisionShape(s) => s.id.as_deref(),
            NodeKind::TileLayer(l) => Some(&l.id),
            NodeKind::Collection(_) | NodeKind::TileGrid(_) => None,
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            NodeKind::GameObject(go) => go.id = Some(id),
            NodeKind::GameObjectInstance(i) => i.id = id,
            NodeKind::CollectionInstance(i) => i.id = id,
            NodeKind::ComponentRef(c) => c.id = id,
            NodeKind::CollisionShape(s) => s.id = Some(id),
            NodeKind::TileLayer(l) => l.id = id,
            NodeKind::Collection(_) | NodeKind::TileGrid(_) => {}
        }
    }

    /// Components are sorted by id inside game objects
    pub fn is_component(&self) -> bool {
        matches!(self, NodeKind::ComponentRef(_) | NodeKind::CollisionShape(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            NodeKind::GameObjectInstance(_) | NodeKind::CollectionInstance(_)
        )
    }

    /// Path of the referenced document, for reference nodes
    pub fn reference_path(&self) -> Option<&str> {
        match self {
            NodeKind::GameObjectInstance(i) => Some(&i.prototype),
            NodeKind::CollectionInstance(i) => Some(&i.collection),
            _ => None,
        }
    }

    /// Kind a reference node's document must load as
    pub fn reference_target(&self) -> Option<&'static str> {
        match self {
            NodeKind::GameObjectInstance(_) => Some(kinds::GAME_OBJECT),
            NodeKind::CollectionInstance(_) => Some(kinds::COLLECTION),
            _ => None,
        }
    }

    pub fn overrides(&self) -> Option<&Overrides> {
        match self {
            NodeKind::GameObjectInstance(i) => Some(&i.overrides),
            NodeKind::CollectionInstance(i) => Some(&i.overrides),
            _ => None,
        }
    }

    pub fn overrides_mut(&mut self) -> Option<&mut Overrides> {
        match self {
            NodeKind::GameObjectInstance(i) => Some(&mut i.overrides),
            NodeKind::CollectionInstance(i) => Some(&mut i.overrides),
            _ => None,
        }
    }

    /// Error of the last failed load of a reference or script
    pub fn load_error(&self) -> Option<&str> {
        match self {
            NodeKind::GameObjectInstance(i) => i.load_error.as_deref(),
            NodeKind::CollectionInstance(i) => i.load_error.as_deref(),
            NodeKind::ComponentRef(c) => c.load_error.as_deref(),
            _ => None,
        }
    }

    pub fn set_load_error(&mut self, error: Option<String>) {
        match self {
            NodeKind::GameObjectInstance(i) => i.load_error = error,
            NodeKind::CollectionInstance(i) => i.load_error = error,
            NodeKind::ComponentRef(c) => c.load_error = error,
            _ => {}
        }
    }
}

/// Registry keys of the node kinds
pub mod kinds {
    pub const COLLECTION: &str = "collection";
    pub const GAME_OBJECT: &str = "game_object";
    pub const GAME_OBJECT_INSTANCE: &str = "game_object_instance";
    pub const COLLECTION_INSTANCE: &str = "collection_instance";
    pub const COMPONENT: &str = "component";
    pub const COLLISION_SHAPE: &str = "collision_shape";
    pub const TILE_GRID: &str = "tile_grid";
    pub const TILE_LAYER: &str = "tile_layer";
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub name: String,
    pub scale_along_z: bool,
}

/// Game object document, or a game object embedded in a collection (with an id)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameObject {
    pub id: Option<String>,
}

/// Instance of a `.go` document inside a collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameObjectInstance {
    pub id: String,
    pub prototype: String,
    /// Keyed by component id
    pub overrides: Overrides,
    pub load_error: Option<String>,
}

/// Instance of a `.collection` document inside another collection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionInstance {
    pub id: String,
    pub collection: String,
    /// Keyed by the id path of a game object inside the referenced collection
    /// and the id of its component
    pub overrides: Overrides,
    pub load_error: Option<String>,
}

/// Script component of a game object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentRef {
    pub id: String,
    pub component: String,
    /// Property values set on the component itself
    pub properties: IndexMap<String, String>,
    /// Declarations found in the script
    pub declared: Rc<Vec<ScriptProperty>>,
    pub load_error: Option<String>,
}

impl ComponentRef {
    pub fn declared(&self, name: &str) -> Option<&ScriptProperty> {
        self.declared.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeType {
    Sphere,
    #[default]
    Box,
    Capsule,
}

impl ShapeType {
    pub const ALL: [ShapeType; 3] = [ShapeType::Sphere, ShapeType::Box, ShapeType::Capsule];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeType::Sphere => "TYPE_SPHERE",
            ShapeType::Box => "TYPE_BOX",
            ShapeType::Capsule => "TYPE_CAPSULE",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionShape {
    /// Set when embedded as a game object component
    pub id: Option<String>,
    pub shape_type: ShapeType,
    pub dimensions: [f64; 3],
}

impl Default for CollisionShape {
    fn default() -> Self {
        Self {
            id: None,
            shape_type: ShapeType::Box,
            dimensions: [1.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Alpha,
    Add,
    Mult,
    Screen,
}

impl BlendMode {
    pub const ALL: [BlendMode; 4] = [
        BlendMode::Alpha,
        BlendMode::Add,
        BlendMode::Mult,
        BlendMode::Screen,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Alpha => "BLEND_MODE_ALPHA",
            BlendMode::Add => "BLEND_MODE_ADD",
            BlendMode::Mult => "BLEND_MODE_MULT",
            BlendMode::Screen => "BLEND_MODE_SCREEN",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == text)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileGrid {
    pub tile_set: String,
    pub blend_mode: BlendMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileCell {
    pub x: i64,
    pub y: i64,
    pub tile: i64,
    pub h_flip: bool,
    pub v_flip: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileLayer {
    pub id: String,
    pub z: f64,
    pub visible: bool,
    pub cells: Vec<TileCell>,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            id: String::new(),
            z: 0.0,
            visible: true,
            cells: Vec::new(),
        }
    }
}
