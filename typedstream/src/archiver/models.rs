/*!
 Data structures and models produced by the unarchiver.
*/

use std::{
    cell::RefCell,
    fmt::{Display, Formatter, Result as FmtResult},
    rc::Rc,
};

use crate::encoding::Encoding;

/// Information about a class as it is stored at the start of objects in a
/// `typedstream`, linked to its superclass up to the root of the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// The name of the class
    pub name: Rc<[u8]>,
    /// The encoded version of the class
    pub version: i64,
    /// The superclass, or `None` for a root class
    pub superclass: Option<Rc<Class>>,
}

impl Class {
    /// The class name as text; undecodable bytes are replaced.
    pub fn name_string(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Whether this class or any of its superclasses has the given name.
    pub fn is_kind_of(&self, name: &[u8]) -> bool {
        if *self.name == *name {
            return true;
        }
        match &self.superclass {
            Some(superclass) => superclass.is_kind_of(name),
            None => false,
        }
    }
}

impl Display for Class {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{} v{}", self.name_string(), self.version)?;
        if let Some(superclass) = &self.superclass {
            write!(fmt, ", extends {superclass}")?;
        }
        Ok(())
    }
}

/// A group of values serialized together under a single type encoding string.
///
/// Groups are created by archiving several values in one call, which joins
/// their type encodings into one string followed by the values back to back.
/// Single-value groups are by far the most common case.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedGroup {
    /// The type encodings declared for this group
    pub encodings: Vec<Encoding>,
    /// The decoded values, one per encoding
    pub values: Vec<Value>,
}

impl TypedGroup {
    /// The group's only value, if it holds exactly one.
    pub fn single(&self) -> Option<&Value> {
        match self.values.as_slice() {
            [value] => Some(value),
            _ => None,
        }
    }
}

/// The decoded contents of an archived object.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectContents {
    /// The object is currently being decoded. Only observable by a class
    /// decoder that reads back a reference to its own object mid-decode;
    /// such cycles are patched up once the decoder returns.
    Pending,
    /// The raw typed value groups of an object whose class has no registered
    /// decoder, in order of appearance
    Generic(Vec<TypedGroup>),
    /// The representation chosen by the registered class decoder
    Value(Value),
}

/// One archived object: its class chain plus its decoded contents.
///
/// Objects are handed out as [`Rc<RefCell<Object>>`] so that every reference
/// to the same archived object resolves to the same allocation, and so that
/// cyclic graphs can be completed by mutation after the fact.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// The most derived class of the object, linked up to its root class
    pub class: Rc<Class>,
    pub contents: ObjectContents,
}

impl Object {
    /// If this object is an `NSString` or `NSMutableString`, the decoded text.
    pub fn as_string(&self) -> Option<&str> {
        if !self.class.is_kind_of(b"NSString") {
            return None;
        }
        match &self.contents {
            ObjectContents::Value(Value::String(text)) => Some(text),
            _ => None,
        }
    }
}

/// A value decoded from a `typedstream`.
///
/// `typedstream` data doesn't include property names, so object contents are
/// stored in order of appearance.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Signed integer types are coerced into this container
    SignedInteger(i64),
    /// Unsigned integer types are coerced into this container
    UnsignedInteger(u64),
    /// Single-precision floats
    Float(f32),
    /// Double-precision floats
    Double(f64),
    /// Text decoded by a class decoder, for example `NSString` contents
    String(String),
    /// Raw data: `+` strings and char arrays
    Bytes(Vec<u8>),
    /// A shared C string or atom
    CString(Rc<[u8]>),
    /// A selector name
    Selector(Rc<[u8]>),
    /// A fixed-length C array, or the elements of an `NSArray`/`NSSet`
    Array(Vec<Value>),
    /// The entries of an `NSDictionary`, in archive order
    Dictionary(Vec<(Value, Value)>),
    /// A C struct or union; the name is `?` for anonymous types
    Struct { name: String, fields: Vec<Value> },
    /// A class value (`#`), or a class chain read back by a decoder
    Class(Rc<Class>),
    /// An archived object; identical references share one allocation
    Object(Rc<RefCell<Object>>),
    /// A nil object, string, or selector
    Nil,
}

impl Value {
    /// The shared object handle, if this value is an object.
    pub fn as_object(&self) -> Option<&Rc<RefCell<Object>>> {
        match self {
            Value::Object(handle) => Some(handle),
            _ => None,
        }
    }

    /// The decoded text, if this value is an `NSString`-like object or a
    /// string produced by a decoder.
    pub fn as_string(&self) -> Option<String> {
        match self {
            Value::String(text) => Some(text.clone()),
            Value::Object(handle) => handle.borrow().as_string().map(str::to_owned),
            _ => None,
        }
    }
}
