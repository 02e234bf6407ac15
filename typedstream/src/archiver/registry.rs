/*!
 The class decoder registry.

 Archived objects carry their class name, and the unarchiver dispatches each
 object's contents to the decoder registered for that name. Unknown classes
 are not an error: the unarchiver falls back to a generic decoder that keeps
 the raw typed value groups.
*/

use std::{collections::HashMap, rc::Rc};

use crate::{
    archiver::{classes, models::Class, models::Value, unarchiver::Unarchiver},
    error::archiver::ArchiveError,
};

/// A function that decodes the contents of one archived object.
///
/// The decoder is invoked after the object's class chain has been read and the
/// object's identity has been established; it reads the object's typed value
/// groups through the unarchiver and returns whatever representation it
/// chooses. Errors propagate with the class chain attached.
pub type ClassDecoder =
    fn(&mut Unarchiver<'_>, &Rc<Class>) -> Result<Value, ArchiveError>;

/// Maps archived class names to their decoders.
#[derive(Debug, Clone, Default)]
pub struct ClassRegistry {
    decoders: HashMap<Vec<u8>, ClassDecoder>,
}

impl ClassRegistry {
    /// An empty registry: every object decodes through the generic fallback.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with the common Foundation classes registered.
    pub fn with_foundation_classes() -> Self {
        let mut registry = Self::new();
        registry.register(b"NSObject", classes::decode_ns_object);
        registry.register(b"NSString", classes::decode_ns_string);
        registry.register(b"NSMutableString", classes::decode_ns_string);
        registry.register(b"NSData", classes::decode_ns_data);
        registry.register(b"NSMutableData", classes::decode_ns_data);
        registry.register(b"NSDate", classes::decode_ns_date);
        registry.register(b"NSValue", classes::decode_ns_value);
        registry.register(b"NSNumber", classes::decode_ns_value);
        registry.register(b"NSArray", classes::decode_ns_array);
        registry.register(b"NSMutableArray", classes::decode_ns_array);
        registry.register(b"NSSet", classes::decode_ns_set);
        registry.register(b"NSMutableSet", classes::decode_ns_set);
        registry.register(b"NSDictionary", classes::decode_ns_dictionary);
        registry.register(b"NSMutableDictionary", classes::decode_ns_dictionary);
        registry
    }

    /// Register a decoder for a class name. Several names may share one
    /// decoder; a later registration for the same name replaces the earlier.
    pub fn register(&mut self, class_name: &[u8], decoder: ClassDecoder) {
        self.decoders.insert(class_name.to_vec(), decoder);
    }

    /// Look up the decoder for a class name. `None` means the caller should
    /// use the generic fallback.
    pub fn lookup(&self, class_name: &[u8]) -> Option<ClassDecoder> {
        self.decoders.get(class_name).copied()
    }
}
