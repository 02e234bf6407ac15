/*!
 The unarchiver: drives the low-level event stream and reconstructs the graph
 of archived values, dispatching object contents to registered class decoders.
*/

use std::{cell::RefCell, rc::Rc, slice};

use crate::{
    archiver::{
        models::{Class, Object, ObjectContents, TypedGroup, Value},
        registry::ClassRegistry,
    },
    encoding::{encoding_string, Encoding},
    error::{archiver::ArchiveError, stream::StreamError},
    stream::{
        events::{Event, Reference, ReferenceKind},
        reader::TypedStreamReader,
        refs::SharedTable,
    },
};

/// Decodes archived values from the event stream of a [`TypedStreamReader`].
///
/// The unarchiver owns the reader for the duration of the decode. Shared
/// object and class tables are scoped to one unarchiver instance; string
/// references resolve against the reader's string table.
///
/// # Example:
///
/// ```no_run
/// use typedstream::archiver::unarchiver::Unarchiver;
///
/// let bytes: Vec<u8> = vec![]; // Example stream
/// let mut unarchiver = Unarchiver::from_bytes(&bytes).unwrap();
/// let root = unarchiver.decode_single_root();
/// ```
#[derive(Debug)]
pub struct Unarchiver<'a> {
    /// The low-level reader supplying events
    reader: TypedStreamReader<'a>,
    /// Decoders keyed by archived class name
    registry: ClassRegistry,
    /// Decoded objects, in ID assignment order
    objects: SharedTable<Value>,
    /// Interned class chains, in ID assignment order
    classes: SharedTable<Rc<Class>>,
    /// A single event of lookahead, used to detect where object contents end
    lookahead: Option<Event>,
}

impl<'a> Unarchiver<'a> {
    /// Create an unarchiver over an already constructed reader, with the
    /// Foundation classes registered.
    pub fn new(reader: TypedStreamReader<'a>) -> Self {
        Self::with_registry(reader, ClassRegistry::with_foundation_classes())
    }

    /// Create an unarchiver that dispatches to the given registry.
    pub fn with_registry(reader: TypedStreamReader<'a>, registry: ClassRegistry) -> Self {
        Self {
            reader,
            registry,
            objects: SharedTable::new(ReferenceKind::Object),
            classes: SharedTable::new(ReferenceKind::Class),
            lookahead: None,
        }
    }

    /// Validate the header of the given `typedstream` data and create an
    /// unarchiver for it.
    pub fn from_bytes(data: &'a [u8]) -> Result<Self, ArchiveError> {
        Ok(Self::new(TypedStreamReader::new(data)?))
    }

    fn next_event(&mut self) -> Result<Option<Event>, ArchiveError> {
        if let Some(event) = self.lookahead.take() {
            return Ok(Some(event));
        }
        loop {
            match self.reader.next() {
                Some(Ok(Event::Header { .. })) => continue,
                Some(Ok(event)) => return Ok(Some(event)),
                Some(Err(why)) => return Err(why.into()),
                None => return Ok(None),
            }
        }
    }

    /// Pull the next event, treating the end of the stream as truncation.
    fn require_event(&mut self, expected: &'static str) -> Result<Event, ArchiveError> {
        match self.next_event()? {
            Some(event) => Ok(event),
            None => Err(StreamError::Truncated {
                offset: self.reader.position(),
                needed: 1,
            }
            .into()),
        }
    }

    fn resolve_reference(&mut self, reference: Reference) -> Result<Value, ArchiveError> {
        match reference.kind {
            ReferenceKind::Object => Ok(self.objects.resolve(reference.number)?.clone()),
            ReferenceKind::Class => {
                Ok(Value::Class(Rc::clone(self.classes.resolve(reference.number)?)))
            }
            ReferenceKind::CString => {
                Ok(Value::CString(self.reader.shared_string(reference.number)?))
            }
        }
    }

    /// Rebuild a class chain whose first literal link has already been read.
    ///
    /// `SingleClass` events arrive most-derived first, but each [`Class`] can
    /// only be built once its superclass exists, so the chain is constructed
    /// in reverse and then interned in stream order.
    fn decode_class_chain(
        &mut self,
        first_name: Rc<[u8]>,
        first_version: i64,
    ) -> Result<Rc<Class>, ArchiveError> {
        let mut singles = vec![(first_name, first_version)];
        let terminator = loop {
            match self.require_event("a class chain event")? {
                Event::SingleClass { name, version, .. } => singles.push((name, version)),
                Event::Nil => break None,
                Event::Reference(
                    reference @ Reference {
                        kind: ReferenceKind::Class,
                        ..
                    },
                ) => break Some(Rc::clone(self.classes.resolve(reference.number)?)),
                other => {
                    return Err(ArchiveError::UnexpectedEvent {
                        expected: "a class chain event",
                        found: other.to_string(),
                    })
                }
            }
        };

        let mut next_superclass = terminator;
        let mut new_classes = Vec::with_capacity(singles.len());
        for (name, version) in singles.into_iter().rev() {
            let class = Rc::new(Class {
                name,
                version,
                superclass: next_superclass.clone(),
            });
            next_superclass = Some(Rc::clone(&class));
            new_classes.push(class);
        }
        new_classes.reverse();
        for class in &new_classes {
            self.classes.intern(Rc::clone(class));
        }

        new_classes
            .into_iter()
            .next()
            .ok_or(ArchiveError::UnexpectedEvent {
                expected: "a class chain event",
                found: "an empty class chain".to_string(),
            })
    }

    /// Decode a literally stored object whose `BeginObject` event has already
    /// been consumed.
    ///
    /// The object's ID is reserved before its class chain is read, and the
    /// shared handle is installed as soon as the class is known, so that
    /// references to the object from inside its own contents resolve to the
    /// same (partially decoded) allocation.
    fn decode_object(&mut self, number: u32) -> Result<Value, ArchiveError> {
        self.objects.intern(Value::Nil);

        let class = match self.require_event("a class chain")? {
            Event::SingleClass { name, version, .. } => {
                self.decode_class_chain(name, version)?
            }
            Event::Reference(
                reference @ Reference {
                    kind: ReferenceKind::Class,
                    ..
                },
            ) => Rc::clone(self.classes.resolve(reference.number)?),
            other => {
                return Err(ArchiveError::UnexpectedEvent {
                    expected: "a class chain",
                    found: other.to_string(),
                })
            }
        };

        let handle = Rc::new(RefCell::new(Object {
            class: Rc::clone(&class),
            contents: ObjectContents::Pending,
        }));
        self.objects
            .replace(number, Value::Object(Rc::clone(&handle)))?;

        match self.registry.lookup(&class.name) {
            Some(decode) => {
                let value = decode(self, &class).map_err(|why| {
                    ArchiveError::ClassDecoderFailed {
                        class: class.to_string(),
                        source: Box::new(why),
                    }
                })?;
                handle.borrow_mut().contents = ObjectContents::Value(value);
                match self.require_event("the end of the object")? {
                    Event::EndObject => {}
                    other => {
                        return Err(ArchiveError::UnexpectedEvent {
                            expected: "the end of the object",
                            found: other.to_string(),
                        })
                    }
                }
            }
            None => {
                let mut groups = vec![];
                loop {
                    let event = self.require_event("object contents or the end of the object")?;
                    if event == Event::EndObject {
                        break;
                    }
                    self.lookahead = Some(event);
                    groups.push(self.decode_typed_values()?);
                }
                handle.borrow_mut().contents = ObjectContents::Generic(groups);
            }
        }

        Ok(Value::Object(handle))
    }

    /// Decode one value, whatever its type turns out to be.
    fn decode_untyped_value(&mut self) -> Result<Value, ArchiveError> {
        match self.require_event("a value")? {
            Event::SignedInteger(value) => Ok(Value::SignedInteger(value)),
            Event::UnsignedInteger(value) => Ok(Value::UnsignedInteger(value)),
            Event::Float(value) => Ok(Value::Float(value)),
            Event::Double(value) => Ok(Value::Double(value)),
            Event::Bytes(data) => Ok(Value::Bytes(data)),
            Event::Nil => Ok(Value::Nil),
            Event::CString { contents, .. } => Ok(Value::CString(contents)),
            Event::Atom(Some(contents)) => Ok(Value::CString(contents)),
            Event::Atom(None) => Ok(Value::Nil),
            Event::Selector(Some(name)) => Ok(Value::Selector(name)),
            Event::Selector(None) => Ok(Value::Nil),
            Event::Reference(reference) => self.resolve_reference(reference),
            Event::SingleClass { name, version, .. } => {
                Ok(Value::Class(self.decode_class_chain(name, version)?))
            }
            Event::BeginObject { number } => self.decode_object(number),
            Event::ByteArray { data, .. } => Ok(Value::Bytes(data)),
            Event::BeginArray { length, .. } => {
                let mut elements = Vec::with_capacity(length);
                for _ in 0..length {
                    elements.push(self.decode_untyped_value()?);
                }
                match self.require_event("the end of the array")? {
                    Event::EndArray => Ok(Value::Array(elements)),
                    other => Err(ArchiveError::UnexpectedEvent {
                        expected: "the end of the array",
                        found: other.to_string(),
                    }),
                }
            }
            Event::BeginStruct { name, fields } => {
                let mut values = Vec::with_capacity(fields.len());
                for _ in 0..fields.len() {
                    values.push(self.decode_untyped_value()?);
                }
                match self.require_event("the end of the struct")? {
                    Event::EndStruct => Ok(Value::Struct {
                        name,
                        fields: values,
                    }),
                    other => Err(ArchiveError::UnexpectedEvent {
                        expected: "the end of the struct",
                        found: other.to_string(),
                    }),
                }
            }
            other => Err(ArchiveError::UnexpectedEvent {
                expected: "a value",
                found: other.to_string(),
            }),
        }
    }

    /// Decode the next group of typed values. The number of values and their
    /// types come from the type encoding string in the stream.
    pub fn decode_typed_values(&mut self) -> Result<TypedGroup, ArchiveError> {
        let encodings = match self.require_event("the beginning of a typed value group")? {
            Event::BeginTypedValues(encodings) => encodings,
            other => {
                return Err(ArchiveError::UnexpectedEvent {
                    expected: "the beginning of a typed value group",
                    found: other.to_string(),
                })
            }
        };

        let mut values = Vec::with_capacity(encodings.len());
        for _ in 0..encodings.len() {
            values.push(self.decode_untyped_value()?);
        }

        match self.require_event("the end of the typed value group")? {
            Event::EndTypedValues => Ok(TypedGroup { encodings, values }),
            other => Err(ArchiveError::UnexpectedEvent {
                expected: "the end of the typed value group",
                found: other.to_string(),
            }),
        }
    }

    /// Decode the next group of typed values, which must carry exactly the
    /// expected type encodings.
    ///
    /// Encodings are compared structurally after normalization: anonymous
    /// struct names match any name. A mismatch fails with
    /// [`ArchiveError::TypeMismatch`].
    pub fn decode_values_of_types(
        &mut self,
        expected: &[Encoding],
    ) -> Result<Vec<Value>, ArchiveError> {
        let group = self.decode_typed_values()?;
        let compatible = group.encodings.len() == expected.len()
            && group
                .encodings
                .iter()
                .zip(expected)
                .all(|(actual, expected)| actual.matches(expected));
        if !compatible {
            return Err(ArchiveError::TypeMismatch {
                expected: encoding_string(expected),
                actual: encoding_string(&group.encodings),
            });
        }
        Ok(group.values)
    }

    /// Decode a single value of the expected type.
    pub fn decode_value_of_type(&mut self, expected: &Encoding) -> Result<Value, ArchiveError> {
        let mut values = self.decode_values_of_types(slice::from_ref(expected))?;
        Ok(values.remove(0))
    }

    /// Decode a fixed-length C array of the given element type.
    pub fn decode_array(
        &mut self,
        length: usize,
        element: Encoding,
    ) -> Result<Value, ArchiveError> {
        self.decode_value_of_type(&Encoding::Array {
            length,
            element: Box::new(element),
        })
    }

    /// Decode a data object: an `i` byte count followed by that many chars.
    pub fn decode_data_object(&mut self) -> Result<Vec<u8>, ArchiveError> {
        let length = match self.decode_value_of_type(&Encoding::Int)? {
            Value::SignedInteger(length) if length >= 0 => length as usize,
            Value::SignedInteger(length) => {
                return Err(ArchiveError::UnexpectedEvent {
                    expected: "a non-negative data length",
                    found: length.to_string(),
                })
            }
            other => {
                return Err(ArchiveError::UnexpectedEvent {
                    expected: "a data length",
                    found: format!("{other:?}"),
                })
            }
        };
        match self.decode_array(length, Encoding::Char)? {
            Value::Bytes(data) => Ok(data),
            other => Err(ArchiveError::UnexpectedEvent {
                expected: "byte array data",
                found: format!("{other:?}"),
            }),
        }
    }

    /// Decode every top-level typed value group in the stream.
    ///
    /// A stream that ends before the first group is truncated.
    pub fn decode_all(&mut self) -> Result<Vec<TypedGroup>, ArchiveError> {
        let mut contents = vec![];
        while let Some(event) = self.next_event()? {
            self.lookahead = Some(event);
            contents.push(self.decode_typed_values()?);
        }
        if contents.is_empty() {
            return Err(StreamError::Truncated {
                offset: self.reader.position(),
                needed: 1,
            }
            .into());
        }
        Ok(contents)
    }

    /// Decode the single root value of the stream, failing if the stream
    /// holds anything other than exactly one single-value group.
    pub fn decode_single_root(&mut self) -> Result<Value, ArchiveError> {
        let mut groups = self.decode_all()?;
        if groups.len() > 1 {
            return Err(ArchiveError::MultipleRootValues(groups.len()));
        }
        let group = groups.pop().ok_or(ArchiveError::NoRootValue)?;
        if group.values.len() != 1 {
            return Err(ArchiveError::MultipleRootValues(group.values.len()));
        }
        group.values.into_iter().next().ok_or(ArchiveError::NoRootValue)
    }
}

/// Unarchive the single root value from the given `typedstream` data.
pub fn unarchive_from_bytes(data: &[u8]) -> Result<Value, ArchiveError> {
    Unarchiver::from_bytes(data)?.decode_single_root()
}

/// Unarchive every top-level typed value group from the given data.
pub fn unarchive_all_from_bytes(data: &[u8]) -> Result<Vec<TypedGroup>, ArchiveError> {
    Unarchiver::from_bytes(data)?.decode_all()
}
