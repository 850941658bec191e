use super::Validator;
use crate::status::Status;
use crate::value::PropertyValue;

/// Content-root access needed to validate resource paths
pub trait ResourceWorld {
    fn resource_exists(&self, path: &str) -> bool;
}

/// Fails when a non-empty resource path does not resolve, or has an
/// extension outside the accepted list. Empty paths are left to [`NotEmpty`](super::NotEmpty).
#[derive(Debug, Clone, Default)]
pub struct ResourceExists {
    pub extensions: Vec<String>,
}

impl ResourceExists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    fn accepts(&self, path: &str) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let extension = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        self.extensions.iter().any(|e| e == extension)
    }
}

impl<O, W: ResourceWorld> Validator<O, W> for ResourceExists {
    fn name(&self) -> &'static str {
        "resource-exists"
    }

    fn validate(&self, _object: &O, property: &str, value: &PropertyValue, world: &W) -> Status {
        let path = match value.as_str() {
            Some(path) if !path.is_empty() => path,
            _ => return Status::ok(),
        };

        if !self.accepts(path) {
            return Status::error(format!(
                "'{}' of '{}' is not one of: {}",
                path,
                property,
                self.extensions.join(", ")
            ));
        }
        if !world.resource_exists(path) {
            return Status::error(format!("'{}' could not be found", path));
        }
        Status::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Files(Vec<&'static str>);

    impl ResourceWorld for Files {
        fn resource_exists(&self, path: &str) -> bool {
            self.0.contains(&path)
        }
    }

    #[test]
    fn test_missing_resource() {
        let world = Files(vec!["/main/hero.go"]);
        let validator = ResourceExists::with_extensions(["go"]);
        let check = |path: &str| {
            Validator::<(), Files>::validate(
                &validator,
                &(),
                "prototype",
                &PropertyValue::Resource(path.to_string()),
                &world,
            )
        };

        assert!(check("/main/hero.go").is_ok());
        assert!(check("").is_ok());
        assert_eq!(check("/main/gone.go").message, "'/main/gone.go' could not be found");
        assert!(!check("/main/hero.collection").is_ok());
    }
}
