//! Entity module - type discriminators and polymorphic entity references

use std::any::Any;
use std::borrow::Cow;
use std::fmt;

/// Primary key of an entity within its own type
pub type EntityId = i64;

/// Label identifying one registered entity type (e.g. `food`, `beverage`)
///
/// Discriminators are lowercase ASCII identifiers: letters, digits and
/// underscores, starting with a letter. They are compared by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeDiscriminator(Cow<'static, str>);

impl TypeDiscriminator {
    /// Create a discriminator from a static label without validation
    ///
    /// Intended for constants declared next to an entity type. The label
    /// must follow the same rules [`TypeDiscriminator::parse`] enforces.
    ///
    /// # Examples
    ///
    /// ```
    /// use polyrel_domain::TypeDiscriminator;
    ///
    /// const FOOD: TypeDiscriminator = TypeDiscriminator::from_static("food");
    /// assert_eq!(FOOD.as_str(), "food");
    /// ```
    pub const fn from_static(label: &'static str) -> Self {
        Self(Cow::Borrowed(label))
    }

    /// Parse and validate a discriminator label
    ///
    /// # Errors
    /// Returns error if the label is empty or contains anything other than
    /// lowercase letters, digits and underscores.
    pub fn parse(label: &str) -> Result<Self, String> {
        if is_identifier(label) {
            Ok(Self(Cow::Owned(label.to_string())))
        } else {
            Err(format!("Invalid type discriminator: {:?}", label))
        }
    }

    /// Get the label as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeDiscriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for TypeDiscriminator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Check whether `s` is a lowercase identifier (`[a-z][a-z0-9_]*`)
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Stable `(type, id)` pair identifying any entity in the system
///
/// Two references are equal iff both the discriminator and the id are equal.
/// References are never stored on their own; they are embedded in the
/// endpoint fields of an edge record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityRef {
    /// Type of the referenced entity
    pub discriminator: TypeDiscriminator,

    /// Primary key of the referenced entity
    pub id: EntityId,
}

impl EntityRef {
    /// Create a new reference
    pub fn new(discriminator: TypeDiscriminator, id: EntityId) -> Self {
        Self { discriminator, id }
    }

    /// Check whether this reference points at an entity of the given type
    pub fn is_a(&self, discriminator: &TypeDiscriminator) -> bool {
        &self.discriminator == discriminator
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.discriminator, self.id)
    }
}

/// Any application type that can appear as an edge endpoint
///
/// Implementors report their discriminator and primary key. `as_any` lets
/// callers downcast entities coming back from batch resolution.
///
/// # Examples
///
/// ```
/// use std::any::Any;
/// use polyrel_domain::{Entity, EntityId, TypeDiscriminator};
///
/// #[derive(Debug)]
/// struct Food { id: EntityId, name: String }
///
/// impl Entity for Food {
///     fn discriminator(&self) -> TypeDiscriminator {
///         TypeDiscriminator::from_static("food")
///     }
///     fn id(&self) -> EntityId { self.id }
///     fn as_any(&self) -> &dyn Any { self }
/// }
///
/// let pizza = Food { id: 1, name: "pizza".into() };
/// assert_eq!(pizza.entity_ref().to_string(), "food:1");
/// ```
pub trait Entity: fmt::Debug + Send + Sync + 'static {
    /// Discriminator of the entity's type
    fn discriminator(&self) -> TypeDiscriminator;

    /// Primary key of the entity
    fn id(&self) -> EntityId;

    /// Access the concrete value for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Reference to this entity
    fn entity_ref(&self) -> EntityRef {
        EntityRef::new(self.discriminator(), self.id())
    }
}

impl dyn Entity {
    /// Downcast to a concrete entity type
    pub fn downcast_ref<T: Entity>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Check whether the entity is of the given type
    pub fn is_a(&self, discriminator: &TypeDiscriminator) -> bool {
        &self.discriminator() == discriminator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Widget(EntityId);

    impl Entity for Widget {
        fn discriminator(&self) -> TypeDiscriminator {
            TypeDiscriminator::from_static("widget")
        }

        fn id(&self) -> EntityId {
            self.0
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_discriminator_parse() {
        assert!(TypeDiscriminator::parse("food").is_ok());
        assert!(TypeDiscriminator::parse("related_object2").is_ok());
        assert!(TypeDiscriminator::parse("").is_err());
        assert!(TypeDiscriminator::parse("Food").is_err());
        assert!(TypeDiscriminator::parse("2food").is_err());
        assert!(TypeDiscriminator::parse("food item").is_err());
    }

    #[test]
    fn test_static_and_parsed_are_equal() {
        let a = TypeDiscriminator::from_static("food");
        let b: TypeDiscriminator = "food".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_entity_ref_display() {
        let r = EntityRef::new(TypeDiscriminator::from_static("beverage"), 7);
        assert_eq!(r.to_string(), "beverage:7");
    }

    #[test]
    fn test_downcast() {
        let boxed: Box<dyn Entity> = Box::new(Widget(3));
        assert_eq!(boxed.downcast_ref::<Widget>().map(|w| w.0), Some(3));
        assert!(boxed.is_a(&TypeDiscriminator::from_static("widget")));
        assert_eq!(boxed.entity_ref().id, 3);
    }
}
