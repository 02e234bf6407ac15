/*!
 The low-level `typedstream` reader: head-byte decoding plus the state machine
 that turns the byte format into a flat stream of [`Event`]s.

 Logic reverse engineered from the `typedstream` sources located at:
   - [`typedstream.h`](https://opensource.apple.com/source/gcc/gcc-1493/libobjc/objc/typedstream.h.auto.html)
   - [`archive.c`](https://opensource.apple.com/source/gcc/gcc-5484/libobjc/archive.c.auto.html)
   - [`objc/typedstream.m`](https://archive.org/details/darwin_0.1)

 Terminology: a "head" is the leading byte of every encoded quantity. It either
 stores a single-byte integer literal directly, or one of the `TAG_*` constants
 below. Values in the tag range that are meant literally are escaped through
 `TAG_INTEGER_2`. Reference numbers are integers at or above
 `FIRST_REFERENCE_NUMBER`, chosen to sit exactly past the tag range so that
 early references still fit in one byte.
*/

use std::rc::Rc;

use crate::{
    encoding::{split_encodings, Encoding},
    error::stream::StreamError,
    stream::{
        byte_reader::ByteReader,
        events::{ByteOrder, Event, Reference, ReferenceKind},
        refs::SharedTable,
    },
};

/// Indicates an integer stored in the following 2 bytes (`0x81`)
const TAG_INTEGER_2: i8 = -127;
/// Indicates an integer stored in the following 4 bytes (`0x82`)
const TAG_INTEGER_4: i8 = -126;
/// Indicates a float or double in the following 4 or 8 bytes; the expected
/// type encoding determines the size (`0x83`)
const TAG_FLOATING_POINT: i8 = -125;
/// Indicates a string or object stored literally rather than as a back-reference (`0x84`)
const TAG_NEW: i8 = -124;
/// Indicates a nil value: strings, classes, objects, and ends of class chains (`0x85`)
const TAG_NIL: i8 = -123;
/// Indicates the end of an object (`0x86`)
const TAG_END_OF_OBJECT: i8 = -122;

/// The lowest and highest byte values reserved for tags; heads outside this
/// range encode single-byte integer literals.
const FIRST_TAG: i8 = -128;
const LAST_TAG: i8 = -111;

/// The first reference number, exactly one past the tag range (`0x92`).
const FIRST_REFERENCE_NUMBER: i64 = (LAST_TAG as i64) + 1;

/// The streamer version produced by all versions of Mac OS X and later
/// versions of NeXTSTEP; the only one this crate reads.
pub const STREAMER_VERSION_CURRENT: u8 = 4;
/// The earliest streamer version still recognized by Mac OS X, produced only
/// by early NeXTSTEP. Recognized here solely to reject it with a clear error.
pub const STREAMER_VERSION_OLD_NEXTSTEP: u8 = 3;

/// Signature string for big-endian typedstreams
pub const SIGNATURE_BIG_ENDIAN: &[u8] = b"typedstream";
/// Signature string for little-endian typedstreams
pub const SIGNATURE_LITTLE_ENDIAN: &[u8] = b"streamtyped";
/// Both signature strings have the same length
const SIGNATURE_LENGTH: usize = 11;

/// Decoding state: the header is consumed during construction, events are
/// produced one per [`Iterator::next`] call, and the machine never advances
/// past the end of the stream or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    HeaderConsumed,
    Emitting,
    Done,
    Failed,
}

/// Pending work inside the current typed value group. Each frame step produces
/// exactly one event, so the reader stays a pull-based forward iterator with
/// no partial-event state visible to callers.
#[derive(Debug)]
enum Frame {
    /// A typed value group with the next encoding to produce a value for
    Values { encodings: Vec<Encoding>, index: usize },
    /// Inside an object, between its typed value groups
    Object,
    /// Inside a class chain, before the terminating nil or reference
    ClassChain,
    /// Inside an array with `remaining` elements left
    Array { element: Encoding, remaining: usize },
    /// Inside a struct or union with the next field to read
    Struct { fields: Vec<Encoding>, index: usize },
}

/// Reads `typedstream` data from a raw byte slice as a forward-only stream of
/// [`Event`]s.
///
/// A `typedstream` begins with a header holding the streamer version, a
/// signature that doubles as the byte-order marker, and the system version.
/// The rest of the stream is a sequence of typed value groups: a shared type
/// encoding string followed by one value per encoding.
///
/// # Example:
///
/// ```no_run
/// use typedstream::stream::reader::TypedStreamReader;
///
/// let bytes: Vec<u8> = vec![]; // Example stream
/// let reader = TypedStreamReader::new(&bytes).unwrap();
/// for event in reader {
///     println!("{}", event.unwrap());
/// }
/// ```
#[derive(Debug)]
pub struct TypedStreamReader<'a> {
    /// The positioned byte source
    source: ByteReader<'a>,
    /// The streamer version from the header, always 4
    streamer_version: u8,
    /// The byte order encoded by the header signature
    byte_order: ByteOrder,
    /// The system version from the header
    system_version: i64,
    /// Shared C strings and type encoding strings, in order of first appearance
    strings: SharedTable<Rc<[u8]>>,
    /// How many object IDs have been assigned so far
    object_count: u32,
    /// How many class IDs have been assigned so far
    class_count: u32,
    state: State,
    frames: Vec<Frame>,
}

impl<'a> TypedStreamReader<'a> {
    /// Validate the header of the given `typedstream` and construct a reader
    /// for the events that follow it.
    pub fn new(data: &'a [u8]) -> Result<Self, StreamError> {
        let mut source = ByteReader::new(data);

        let streamer_version = source.read_u8()?;
        if streamer_version != STREAMER_VERSION_CURRENT {
            return Err(StreamError::UnsupportedStreamerVersion(streamer_version));
        }

        let signature_length = source.read_u8()?;
        if usize::from(signature_length) != SIGNATURE_LENGTH {
            return Err(StreamError::InvalidSignature(vec![signature_length]));
        }
        let signature = source.read_exact(SIGNATURE_LENGTH)?;
        let byte_order = if signature == SIGNATURE_BIG_ENDIAN {
            ByteOrder::Big
        } else if signature == SIGNATURE_LITTLE_ENDIAN {
            ByteOrder::Little
        } else {
            return Err(StreamError::InvalidSignature(signature.to_vec()));
        };
        source.set_byte_order(byte_order);

        let mut reader = Self {
            source,
            streamer_version,
            byte_order,
            system_version: 0,
            strings: SharedTable::new(ReferenceKind::CString),
            object_count: 0,
            class_count: 0,
            state: State::HeaderConsumed,
            frames: vec![],
        };
        reader.system_version = reader.read_integer(None, false)?;
        Ok(reader)
    }

    pub fn streamer_version(&self) -> u8 {
        self.streamer_version
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn system_version(&self) -> i64 {
        self.system_version
    }

    /// The current byte offset, for diagnostics.
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Resolve a previously interned C string or type encoding string.
    pub fn shared_string(&self, number: u32) -> Result<Rc<[u8]>, StreamError> {
        Ok(Rc::clone(self.strings.resolve(number)?))
    }

    fn malformed_head(&self, head: i8) -> StreamError {
        StreamError::MalformedHead {
            head: head as u8,
            offset: self.source.position().saturating_sub(1),
        }
    }

    /// Read a head byte, or use one that a caller already read ahead.
    fn read_head_byte(&mut self, head: Option<i8>) -> Result<i8, StreamError> {
        match head {
            Some(head) => Ok(head),
            None => Ok(self.source.read_u8()? as i8),
        }
    }

    /// Read a head-byte-encoded integer. Heads outside the tag range are the
    /// value itself; `TAG_INTEGER_2`/`TAG_INTEGER_4` extend to 2 or 4 bytes in
    /// the header's byte order.
    fn read_integer(&mut self, head: Option<i8>, signed: bool) -> Result<i64, StreamError> {
        let head = self.read_head_byte(head)?;
        if !(FIRST_TAG..=LAST_TAG).contains(&head) {
            return Ok(if signed {
                i64::from(head)
            } else {
                i64::from(head as u8)
            });
        }
        match head {
            TAG_INTEGER_2 => Ok(if signed {
                i64::from(self.source.read_i16()?)
            } else {
                i64::from(self.source.read_u16()?)
            }),
            TAG_INTEGER_4 => Ok(if signed {
                i64::from(self.source.read_i32()?)
            } else {
                i64::from(self.source.read_u32()?)
            }),
            other => Err(self.malformed_head(other)),
        }
    }

    /// Read a single-precision float. Integer heads are accepted and promoted.
    fn read_float(&mut self, head: Option<i8>) -> Result<f32, StreamError> {
        let head = self.read_head_byte(head)?;
        if head == TAG_FLOATING_POINT {
            self.source.read_f32()
        } else {
            Ok(self.read_integer(Some(head), true)? as f32)
        }
    }

    /// Read a double-precision float. Integer heads are accepted and promoted.
    fn read_double(&mut self, head: Option<i8>) -> Result<f64, StreamError> {
        let head = self.read_head_byte(head)?;
        if head == TAG_FLOATING_POINT {
            self.source.read_f64()
        } else {
            Ok(self.read_integer(Some(head), true)? as f64)
        }
    }

    /// Read a length-prefixed string stored literally, or `None` for nil.
    fn read_unshared_string(&mut self, head: Option<i8>) -> Result<Option<Vec<u8>>, StreamError> {
        let head = self.read_head_byte(head)?;
        if head == TAG_NIL {
            return Ok(None);
        }
        let length = self.read_integer(Some(head), false)?;
        Ok(Some(self.source.read_exact(length as usize)?.to_vec()))
    }

    /// Read a shared string: either a literal that gets the next string ID, or
    /// a back-reference that is resolved transparently. `None` for nil.
    fn read_shared_string(&mut self, head: Option<i8>) -> Result<Option<Rc<[u8]>>, StreamError> {
        let head = self.read_head_byte(head)?;
        if head == TAG_NIL {
            return Ok(None);
        }
        if head == TAG_NEW {
            let string = self
                .read_unshared_string(None)?
                .ok_or_else(|| self.malformed_head(TAG_NIL))?;
            let shared: Rc<[u8]> = string.into();
            self.strings.intern(Rc::clone(&shared));
            return Ok(Some(shared));
        }
        let number = self.read_reference_number(head, ReferenceKind::CString)?;
        Ok(Some(Rc::clone(self.strings.resolve(number)?)))
    }

    /// Decode a reference number from a head and validate it against the IDs
    /// assigned so far in its namespace. Forward references are fatal.
    fn read_reference_number(
        &mut self,
        head: i8,
        kind: ReferenceKind,
    ) -> Result<u32, StreamError> {
        let value = self.read_integer(Some(head), true)?;
        let number = value - FIRST_REFERENCE_NUMBER;
        if number < 0 {
            return Err(self.malformed_head(head));
        }
        let number = number as u64;
        let assigned = match kind {
            ReferenceKind::CString => self.strings.len() as u64,
            ReferenceKind::Class => u64::from(self.class_count),
            ReferenceKind::Object => u64::from(self.object_count),
        };
        if number >= assigned {
            return Err(StreamError::UnknownReference { kind, number });
        }
        Ok(number as u32)
    }

    /// Read the shared type encoding string that opens a typed value group,
    /// parse it, and queue the group's values.
    fn begin_typed_values(&mut self, head: Option<i8>) -> Result<Event, StreamError> {
        let offset = self.source.position();
        let string = self
            .read_shared_string(head)?
            .ok_or_else(|| self.malformed_head(TAG_NIL))?;
        if string.is_empty() {
            return Err(StreamError::BadTypeEncoding {
                encoding: vec![],
                offset,
            });
        }
        let encodings = split_encodings(&string)?;
        self.frames.push(Frame::Values {
            encodings: encodings.clone(),
            index: 0,
        });
        Ok(Event::BeginTypedValues(encodings))
    }

    /// Read one link of a class chain: a literal class (chain continues), the
    /// terminating nil, or a reference to an earlier chain.
    fn step_class_chain(&mut self) -> Result<Event, StreamError> {
        let head = self.read_head_byte(None)?;
        if head == TAG_NEW {
            let name = self
                .read_shared_string(None)?
                .ok_or_else(|| self.malformed_head(TAG_NIL))?;
            let version = self.read_integer(None, true)?;
            let number = self.class_count;
            self.class_count += 1;
            self.frames.push(Frame::ClassChain);
            return Ok(Event::SingleClass {
                name,
                version,
                number,
            });
        }
        if head == TAG_NIL {
            return Ok(Event::Nil);
        }
        let number = self.read_reference_number(head, ReferenceKind::Class)?;
        Ok(Event::Reference(Reference {
            kind: ReferenceKind::Class,
            number,
        }))
    }

    /// Produce the one event that starts the next value of the given type,
    /// queuing frames for any nested values.
    fn read_value(&mut self, encoding: &Encoding) -> Result<Event, StreamError> {
        match encoding {
            // Chars are always stored literally; the usual head tags do not apply
            Encoding::Char => {
                let byte = self.source.read_u8()?;
                Ok(Event::SignedInteger(i64::from(byte as i8)))
            }
            Encoding::UnsignedChar => {
                let byte = self.source.read_u8()?;
                Ok(Event::UnsignedInteger(u64::from(byte)))
            }
            Encoding::Short => self.read_signed_value('s', i64::from(i16::MIN), i64::from(i16::MAX)),
            Encoding::Int => self.read_signed_value('i', i64::from(i32::MIN), i64::from(i32::MAX)),
            Encoding::Long => self.read_signed_value('l', i64::from(i32::MIN), i64::from(i32::MAX)),
            Encoding::LongLong => self.read_signed_value('q', i64::MIN, i64::MAX),
            Encoding::UnsignedShort => self.read_unsigned_value('S', u64::from(u16::MAX)),
            Encoding::UnsignedInt => self.read_unsigned_value('I', u64::from(u32::MAX)),
            Encoding::UnsignedLong => self.read_unsigned_value('L', u64::from(u32::MAX)),
            Encoding::UnsignedLongLong => self.read_unsigned_value('Q', u64::MAX),
            Encoding::Float => Ok(Event::Float(self.read_float(None)?)),
            Encoding::Double => Ok(Event::Double(self.read_double(None)?)),
            Encoding::Bytes => match self.read_unshared_string(None)? {
                Some(data) => Ok(Event::Bytes(data)),
                None => Ok(Event::Nil),
            },
            Encoding::CString => self.read_c_string(),
            Encoding::Atom => Ok(Event::Atom(self.read_shared_string(None)?)),
            Encoding::Selector => Ok(Event::Selector(self.read_shared_string(None)?)),
            Encoding::Class => self.step_class_chain(),
            Encoding::Object => self.read_object(),
            Encoding::Array { length, element } => {
                // Byte arrays are read all at once instead of one event per element
                if element.is_char_like() {
                    let data = self.source.read_exact(*length)?.to_vec();
                    return Ok(Event::ByteArray {
                        element: (**element).clone(),
                        data,
                    });
                }
                self.frames.push(Frame::Array {
                    element: (**element).clone(),
                    remaining: *length,
                });
                Ok(Event::BeginArray {
                    element: (**element).clone(),
                    length: *length,
                })
            }
            Encoding::Struct { name, fields } => {
                self.frames.push(Frame::Struct {
                    fields: fields.clone(),
                    index: 0,
                });
                Ok(Event::BeginStruct {
                    name: name.clone(),
                    fields: fields.clone(),
                })
            }
            // The selected arm of a union is not recorded in the stream; every
            // arm is decoded in declaration order, matching the original reader
            Encoding::Union { name, members } => {
                self.frames.push(Frame::Struct {
                    fields: members.clone(),
                    index: 0,
                });
                Ok(Event::BeginStruct {
                    name: name.clone(),
                    fields: members.clone(),
                })
            }
            Encoding::Bitfield(_) | Encoding::Pointer(_) | Encoding::Unknown(_) => {
                Err(StreamError::UnsupportedType(encoding.to_string()))
            }
        }
    }

    fn read_signed_value(&mut self, code: char, min: i64, max: i64) -> Result<Event, StreamError> {
        let value = self.read_integer(None, true)?;
        if value < min || value > max {
            return Err(StreamError::ValueOutOfRange {
                encoding: code,
                value,
            });
        }
        Ok(Event::SignedInteger(value))
    }

    fn read_unsigned_value(&mut self, code: char, max: u64) -> Result<Event, StreamError> {
        let value = self.read_integer(None, false)? as u64;
        if value > max {
            return Err(StreamError::ValueOutOfRange {
                encoding: code,
                value: value as i64,
            });
        }
        Ok(Event::UnsignedInteger(value))
    }

    /// Read a `*` value: nil, a literal shared string, or a reference.
    fn read_c_string(&mut self) -> Result<Event, StreamError> {
        let head = self.read_head_byte(None)?;
        if head == TAG_NIL {
            return Ok(Event::Nil);
        }
        if head == TAG_NEW {
            let before = self.strings.len();
            let contents = self
                .read_shared_string(None)?
                .ok_or_else(|| self.malformed_head(TAG_NIL))?;
            let number = if self.strings.len() > before {
                Some(before as u32)
            } else {
                None
            };
            return Ok(Event::CString { contents, number });
        }
        let number = self.read_reference_number(head, ReferenceKind::CString)?;
        Ok(Event::Reference(Reference {
            kind: ReferenceKind::CString,
            number,
        }))
    }

    /// Read an `@` value: nil, a new object (class chain and contents follow),
    /// or a reference.
    fn read_object(&mut self) -> Result<Event, StreamError> {
        let head = self.read_head_byte(None)?;
        if head == TAG_NIL {
            return Ok(Event::Nil);
        }
        if head == TAG_NEW {
            let number = self.object_count;
            self.object_count += 1;
            self.frames.push(Frame::Object);
            self.frames.push(Frame::ClassChain);
            return Ok(Event::BeginObject { number });
        }
        let number = self.read_reference_number(head, ReferenceKind::Object)?;
        Ok(Event::Reference(Reference {
            kind: ReferenceKind::Object,
            number,
        }))
    }

    /// Produce the next event, or `None` at the end of the stream. The end of
    /// the data is only acceptable exactly between top-level groups.
    fn step(&mut self) -> Result<Option<Event>, StreamError> {
        let Some(frame) = self.frames.pop() else {
            if self.source.is_at_end() {
                return Ok(None);
            }
            return self.begin_typed_values(None).map(Some);
        };
        match frame {
            Frame::Values { encodings, index } => {
                if index == encodings.len() {
                    return Ok(Some(Event::EndTypedValues));
                }
                let encoding = encodings[index].clone();
                self.frames.push(Frame::Values {
                    encodings,
                    index: index + 1,
                });
                self.read_value(&encoding).map(Some)
            }
            Frame::Object => {
                let head = self.read_head_byte(None)?;
                if head == TAG_END_OF_OBJECT {
                    return Ok(Some(Event::EndObject));
                }
                self.frames.push(Frame::Object);
                self.begin_typed_values(Some(head)).map(Some)
            }
            Frame::ClassChain => self.step_class_chain().map(Some),
            Frame::Array { element, remaining } => {
                if remaining == 0 {
                    return Ok(Some(Event::EndArray));
                }
                self.frames.push(Frame::Array {
                    element: element.clone(),
                    remaining: remaining - 1,
                });
                self.read_value(&element).map(Some)
            }
            Frame::Struct { fields, index } => {
                if index == fields.len() {
                    return Ok(Some(Event::EndStruct));
                }
                let field = fields[index].clone();
                self.frames.push(Frame::Struct {
                    fields,
                    index: index + 1,
                });
                self.read_value(&field).map(Some)
            }
        }
    }
}

impl<'a> Iterator for TypedStreamReader<'a> {
    type Item = Result<Event, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::HeaderConsumed => {
                self.state = State::Emitting;
                Some(Ok(Event::Header {
                    streamer_version: self.streamer_version,
                    byte_order: self.byte_order,
                    system_version: self.system_version,
                }))
            }
            State::Emitting => match self.step() {
                Ok(Some(event)) => Some(Ok(event)),
                Ok(None) => {
                    self.state = State::Done;
                    None
                }
                Err(why) => {
                    self.state = State::Failed;
                    Some(Err(why))
                }
            },
            State::Done | State::Failed => None,
        }
    }
}
