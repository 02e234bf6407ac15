/*!
 Decoders for the Foundation classes commonly found in typedstreams.

 Each decoder mirrors the corresponding class's `initWithCoder:`-era archive
 layout. Class versions are checked before any data is read; a version this
 crate does not know fails the decode rather than guessing at the layout.
*/

use std::rc::Rc;

use crate::{
    archiver::{
        models::{Class, Value},
        unarchiver::Unarchiver,
    },
    encoding::{split_encodings, Encoding},
    error::archiver::ArchiveError,
};

fn expect_version(class: &Class, expected: i64) -> Result<(), ArchiveError> {
    if class.version != expected {
        return Err(ArchiveError::UnsupportedClassVersion {
            class: class.name_string(),
            version: class.version,
        });
    }
    Ok(())
}

fn unexpected(expected: &'static str, found: &Value) -> ArchiveError {
    ArchiveError::UnexpectedEvent {
        expected,
        found: format!("{found:?}"),
    }
}

/// `NSObject` archives no data of its own.
pub(crate) fn decode_ns_object(
    _unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    Ok(Value::Nil)
}

/// `NSString`/`NSMutableString` v1: one `+` data string holding UTF-8 text.
pub(crate) fn decode_ns_string(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 1)?;
    match unarchiver.decode_value_of_type(&Encoding::Bytes)? {
        Value::Bytes(data) => Ok(Value::String(
            String::from_utf8(data).map_err(ArchiveError::StringParseError)?,
        )),
        other => Err(unexpected("string data", &other)),
    }
}

/// `NSData`/`NSMutableData` v0: a data object (`i` length plus a char array).
pub(crate) fn decode_ns_data(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    Ok(Value::Bytes(unarchiver.decode_data_object()?))
}

/// `NSDate` v0: seconds relative to the 2001-01-01 absolute reference date.
pub(crate) fn decode_ns_date(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    match unarchiver.decode_value_of_type(&Encoding::Double)? {
        value @ Value::Double(_) => Ok(value),
        other => Err(unexpected("a double offset", &other)),
    }
}

/// `NSValue`/`NSNumber` v0: a `*` type encoding string followed by one value
/// of that type.
pub(crate) fn decode_ns_value(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    let contents = match unarchiver.decode_value_of_type(&Encoding::CString)? {
        Value::CString(contents) => contents,
        other => return Err(unexpected("a type encoding string", &other)),
    };
    let encodings = split_encodings(&contents)?;
    let [encoding] = encodings.as_slice() else {
        return Err(ArchiveError::UnexpectedEvent {
            expected: "a single type encoding",
            found: String::from_utf8_lossy(&contents).into_owned(),
        });
    };
    unarchiver.decode_value_of_type(encoding)
}

fn decode_element_count(unarchiver: &mut Unarchiver<'_>) -> Result<usize, ArchiveError> {
    match unarchiver.decode_value_of_type(&Encoding::Int)? {
        Value::SignedInteger(count) if count >= 0 => Ok(count as usize),
        Value::SignedInteger(count) => Err(ArchiveError::UnexpectedEvent {
            expected: "a non-negative element count",
            found: count.to_string(),
        }),
        other => Err(unexpected("an element count", &other)),
    }
}

/// `NSArray`/`NSMutableArray` v0: an `i` count followed by that many objects.
pub(crate) fn decode_ns_array(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    let count = decode_element_count(unarchiver)?;
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        elements.push(unarchiver.decode_value_of_type(&Encoding::Object)?);
    }
    Ok(Value::Array(elements))
}

/// `NSSet`/`NSMutableSet` v0: an `I` count followed by that many objects.
pub(crate) fn decode_ns_set(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    let count = match unarchiver.decode_value_of_type(&Encoding::UnsignedInt)? {
        Value::UnsignedInteger(count) => count as usize,
        other => return Err(unexpected("an element count", &other)),
    };
    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        elements.push(unarchiver.decode_value_of_type(&Encoding::Object)?);
    }
    Ok(Value::Array(elements))
}

/// `NSDictionary`/`NSMutableDictionary` v0: an `i` count followed by that many
/// key/value object pairs.
pub(crate) fn decode_ns_dictionary(
    unarchiver: &mut Unarchiver<'_>,
    class: &Rc<Class>,
) -> Result<Value, ArchiveError> {
    expect_version(class, 0)?;
    let count = decode_element_count(unarchiver)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let key = unarchiver.decode_value_of_type(&Encoding::Object)?;
        let value = unarchiver.decode_value_of_type(&Encoding::Object)?;
        entries.push((key, value));
    }
    Ok(Value::Dictionary(entries))
}
