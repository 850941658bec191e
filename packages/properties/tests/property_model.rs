use scened_properties::*;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// A script component: one static property plus script-declared ones
#[derive(Default)]
struct Script {
    path: String,
    declared: Vec<(String, f64)>,
    overrides: BTreeMap<String, f64>,
}

#[derive(Clone, Default)]
struct ScriptRef(Rc<RefCell<Script>>);

/// Resolves every path that starts with /main
struct Content;

impl ResourceWorld for Content {
    fn resource_exists(&self, path: &str) -> bool {
        path.starts_with("/main/")
    }
}

struct Declared;

impl DynamicProperties<ScriptRef, Content> for Declared {
    fn descriptors(&self, object: &ScriptRef, _world: &Content) -> Vec<PropertyDescriptor> {
        object
            .0
            .borrow()
            .declared
            .iter()
            .map(|(id, _)| PropertyDescriptor::new(id.clone(), id.clone(), ValueType::Number))
            .collect()
    }
}

struct DeclaredAccessor;

impl PropertyAccessor<ScriptRef, Content> for DeclaredAccessor {
    fn get_value(&self, object: &ScriptRef, property: &str, _: &Content) -> Result<PropertyValue, PropertyError> {
        let script = object.0.borrow();
        if let Some(value) = script.overrides.get(property) {
            return Ok(PropertyValue::Number(*value));
        }
        script
            .declared
            .iter()
            .find(|(id, _)| id == property)
            .map(|(_, default)| PropertyValue::Number(*default))
            .ok_or_else(|| PropertyError::UnknownProperty(property.to_string()))
    }

    fn set_value(
        &self,
        object: &ScriptRef,
        property: &str,
        update: &ValueUpdate,
        world: &Content,
    ) -> Result<(), PropertyError> {
        let current = self.get_value(object, property, world)?;
        let merged = merge(property, &current, update)?;
        object
            .0
            .borrow_mut()
            .overrides
            .insert(property.to_string(), merged.as_f64().unwrap_or_default());
        Ok(())
    }

    fn is_overridden(&self, object: &ScriptRef, property: &str, _: &Content) -> bool {
        object.0.borrow().overrides.contains_key(property)
    }

    fn reset_value(&self, object: &ScriptRef, property: &str, _: &Content) -> Result<(), PropertyError> {
        object.0.borrow_mut().overrides.remove(property);
        Ok(())
    }
}

struct SpeedRules;

impl DynamicValidators<ScriptRef, Content> for SpeedRules {
    fn validators(&self, _: &ScriptRef, property: &str, _: &Content) -> Vec<Rc<dyn Validator<ScriptRef, Content>>> {
        if property == "speed" {
            vec![Rc::new(NotZero), Rc::new(GreaterThanZero)]
        } else {
            Vec::new()
        }
    }
}

fn registry() -> PropertyRegistry<ScriptRef, Content> {
    let mut registry = PropertyRegistry::new();
    registry
        .register(
            KindBuilder::new("script")
                .property(
                    PropertyDef::new("script", "Script", ValueType::Resource)
                        .extensions(["script"])
                        .getter(|s: &ScriptRef| PropertyValue::Resource(s.0.borrow().path.clone()))
                        .setter(|s: &ScriptRef, v, _| {
                            s.0.borrow_mut().path = v.as_str().unwrap_or_default().to_string();
                            Ok(())
                        })
                        .validator(NotEmpty::default())
                        .validator(ResourceExists::with_extensions(["script"])),
                )
                .dynamic_descriptors(Declared)
                .dynamic_accessor(DeclaredAccessor)
                .dynamic_validators(SpeedRules),
        )
        .unwrap();
    registry
}

fn model(script: &ScriptRef) -> PropertyModel<ScriptRef, Content> {
    let registry = registry();
    PropertyModel::new(registry.kind("script").unwrap(), script.clone(), Rc::new(Content))
}

fn sample() -> ScriptRef {
    let script = ScriptRef::default();
    {
        let mut s = script.0.borrow_mut();
        s.path = "/main/player.script".into();
        s.declared = vec![("speed".into(), 1.0), ("jump".into(), 2.0)];
    }
    script
}

#[test]
fn test_descriptors_combine_static_and_dynamic() {
    let script = sample();
    let model = model(&script);

    let ids: Vec<_> = model.descriptors().into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["script", "speed", "jump"]);
    assert_eq!(model.descriptor("script").unwrap().editor, EditorKind::Resource);
    assert!(model.accessor("missing").is_none());
}

#[test]
fn test_dynamic_edit_undo_redo() {
    let script = sample();
    let model = model(&script);

    assert!(!model.is_overridden("speed"));
    let mut op = model.set("speed", PropertyValue::Number(10.0)).unwrap().unwrap();
    op.execute().unwrap();
    assert_eq!(model.value("speed").unwrap(), PropertyValue::Number(10.0));
    assert!(model.is_overridden("speed"));

    op.undo().unwrap();
    assert_eq!(model.value("speed").unwrap(), PropertyValue::Number(1.0));
    assert!(!model.is_overridden("speed"));

    op.redo().unwrap();
    op.undo().unwrap();
    assert_eq!(model.value("speed").unwrap(), PropertyValue::Number(1.0));
    assert!(script.0.borrow().overrides.is_empty());
}

#[test]
fn test_no_op_edit_creates_nothing() {
    let script = sample();
    let model = model(&script);
    assert!(model.set("speed", PropertyValue::Number(1.0)).unwrap().is_none());
    assert!(model.reset("speed").unwrap().is_none());
}

#[test]
fn test_every_failing_validator_is_reported() {
    let script = sample();
    let model = model(&script);
    model
        .set("speed", PropertyValue::Number(0.0))
        .unwrap()
        .unwrap()
        .execute()
        .unwrap();

    let status = model.property_status("speed");
    assert_eq!(status.severity, Severity::Error);
    assert_eq!(
        status.messages(),
        vec!["'speed' must not be zero", "'speed' must be greater than zero"]
    );
}

#[test]
fn test_object_status_evaluates_all_properties() {
    let script = sample();
    script.0.borrow_mut().path = "/other/player.script".into();
    script.0.borrow_mut().overrides.insert("speed".into(), -1.0);
    let model = model(&script);

    let status = model.status();
    assert_eq!(status.severity, Severity::Error);
    assert_eq!(status.for_property("script").len(), 1);
    assert_eq!(status.for_property("speed").len(), 1);
    assert!(status.for_property("jump").is_empty());
}

#[test]
fn test_status_serializes_to_json() {
    let status = Status::merge(vec![
        Status::error("'speed' must not be zero").with_property("speed"),
        Status::info("'image' is not specified").with_property("image"),
    ]);
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["severity"], "Error");
    assert_eq!(json["children"][1]["property"], "image");
}
