//! Names of synthesized types and members

use crate::config::EngineOptions;
use crate::descriptor::QualifiedName;

/// Interface name: `namespace.{prefix}{Name}`
pub fn interface_name(source: &QualifiedName, options: &EngineOptions) -> QualifiedName {
    source.with_name(format!("{}{}", options.interface_prefix, source.name))
}

/// Proxy name: `namespace.{Name}{suffix}`
pub fn proxy_name(source: &QualifiedName, options: &EngineOptions) -> QualifiedName {
    source.with_name(format!("{}{}", source.name, options.proxy_suffix))
}

/// Fluent wrapper name for a proxy
///
/// The proxy suffix is stripped first so `PointProxy` yields `FluentPoint`.
pub fn fluent_name(proxy: &QualifiedName, options: &EngineOptions) -> QualifiedName {
    let suffix = options.proxy_suffix.as_str();
    let base = if suffix.is_empty() {
        proxy.name.as_str()
    } else {
        proxy.name.strip_suffix(suffix).unwrap_or(&proxy.name)
    };
    proxy.with_name(format!("{}{}", options.fluent_prefix, base))
}

/// Property getter method name
pub fn getter(property: &str) -> String {
    format!("get_{}", property)
}

/// Property setter method name
pub fn setter(property: &str) -> String {
    format!("set_{}", property)
}

/// Private backing field for a property: `_camelCase`
pub fn backing_field(property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("_{}{}", first.to_lowercase(), chars.as_str()),
        None => "_".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_names() {
        let options = EngineOptions::default();
        let point = QualifiedName::parse("Acme.Point");
        assert_eq!(interface_name(&point, &options).canonical(), "Acme.IPoint");
        let proxy = proxy_name(&point, &options);
        assert_eq!(proxy.canonical(), "Acme.PointProxy");
        assert_eq!(fluent_name(&proxy, &options).canonical(), "Acme.FluentPoint");
    }

    #[test]
    fn test_custom_affixes() {
        let options = EngineOptions::new()
            .with_interface_prefix("Abstract")
            .with_proxy_suffix("Impl")
            .with_fluent_prefix("Chain");
        let order = QualifiedName::parse("Shop.Order");
        assert_eq!(interface_name(&order, &options).name, "AbstractOrder");
        let proxy = proxy_name(&order, &options);
        assert_eq!(proxy.name, "OrderImpl");
        assert_eq!(fluent_name(&proxy, &options).name, "ChainOrder");
    }

    #[test]
    fn test_empty_suffix_keeps_name() {
        let options = EngineOptions::new().with_proxy_suffix("");
        let proxy = proxy_name(&QualifiedName::parse("Point"), &options);
        assert_eq!(proxy.canonical(), "Point");
        assert_eq!(fluent_name(&proxy, &options).canonical(), "FluentPoint");
    }

    #[test]
    fn test_member_names() {
        assert_eq!(getter("X"), "get_X");
        assert_eq!(setter("FirstName"), "set_FirstName");
        assert_eq!(backing_field("FirstName"), "_firstName");
        assert_eq!(backing_field("Object"), "_object");
        assert_eq!(backing_field("x"), "_x");
    }
}
