#[cfg(test)]
mod class_decoder_tests {
    use std::rc::Rc;

    use crate::archiver::{
        models::{ObjectContents, Value},
        unarchiver::unarchive_from_bytes,
    };
    use crate::error::archiver::ArchiveError;

    fn stream_le(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x04, 0x0B];
        bytes.extend_from_slice(b"streamtyped");
        bytes.extend_from_slice(&[0x81, 0xE8, 0x03]);
        bytes.extend_from_slice(payload);
        bytes
    }

    /// A literal class chain link: `TAG_NEW`, a literal shared name, a version.
    fn class_link(payload: &mut Vec<u8>, name: &[u8], version: u8) {
        payload.extend_from_slice(&[0x84, 0x84]);
        payload.push(name.len() as u8);
        payload.extend_from_slice(name);
        payload.push(version);
    }

    fn decoded_contents(root: &Value) -> Value {
        let handle = root.as_object().unwrap();
        let object = handle.borrow();
        match &object.contents {
            ObjectContents::Value(value) => value.clone(),
            other => panic!("expected decoded contents, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_ns_array_of_strings() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSArray", 0x00);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        // count 2, then one "@" group per element
        payload.extend_from_slice(&[0x84, 0x01, 0x69, 0x02]);
        payload.extend_from_slice(&[0x92, 0x84]);
        class_link(&mut payload, b"NSString", 0x01);
        payload.push(0x93);
        payload.extend_from_slice(&[0x84, 0x01, 0x2B, 0x01]);
        payload.extend_from_slice(b"a");
        payload.push(0x86);
        payload.extend_from_slice(&[0x92, 0x84, 0x94]);
        payload.extend_from_slice(&[0x97, 0x01]);
        payload.extend_from_slice(b"b");
        payload.push(0x86);
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let root = unarchive_from_bytes(&bytes).unwrap();

        let handle = root.as_object().unwrap();
        assert_eq!(handle.borrow().class.name_string(), "NSArray");
        let Value::Array(elements) = decoded_contents(&root) else {
            panic!("expected array contents");
        };
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].as_string(), Some("a".to_string()));
        assert_eq!(elements[1].as_string(), Some("b".to_string()));

        // Both elements resolved their class through the shared class table
        let first_class = Rc::clone(&elements[0].as_object().unwrap().borrow().class);
        let second_class = Rc::clone(&elements[1].as_object().unwrap().borrow().class);
        assert!(Rc::ptr_eq(&first_class, &second_class));
    }

    #[test]
    fn test_decode_ns_dictionary() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSDictionary", 0x00);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        // count 1, then a key group and a value group
        payload.extend_from_slice(&[0x84, 0x01, 0x69, 0x01]);
        payload.extend_from_slice(&[0x92, 0x84]);
        class_link(&mut payload, b"NSString", 0x01);
        payload.push(0x93);
        payload.extend_from_slice(&[0x84, 0x01, 0x2B, 0x01]);
        payload.extend_from_slice(b"k");
        payload.push(0x86);
        payload.extend_from_slice(&[0x92, 0x84, 0x94]);
        payload.extend_from_slice(&[0x97, 0x01]);
        payload.extend_from_slice(b"v");
        payload.push(0x86);
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let root = unarchive_from_bytes(&bytes).unwrap();

        let Value::Dictionary(entries) = decoded_contents(&root) else {
            panic!("expected dictionary contents");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.as_string(), Some("k".to_string()));
        assert_eq!(entries[0].1.as_string(), Some("v".to_string()));
    }

    #[test]
    fn test_decode_ns_data() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSData", 0x00);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        // a data object: an "i" byte count, then the bytes as a char array
        payload.extend_from_slice(&[0x84, 0x01, 0x69, 0x03]);
        payload.extend_from_slice(&[0x84, 0x04]);
        payload.extend_from_slice(b"[3c]");
        payload.extend_from_slice(&[0x01, 0x02, 0x03]);
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let root = unarchive_from_bytes(&bytes).unwrap();

        assert_eq!(decoded_contents(&root), Value::Bytes(vec![0x01, 0x02, 0x03]));
    }

    #[test]
    fn test_decode_ns_date() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSDate", 0x00);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        payload.extend_from_slice(&[0x84, 0x01, 0x64, 0x83]);
        payload.extend_from_slice(&123.5f64.to_le_bytes());
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let root = unarchive_from_bytes(&bytes).unwrap();

        assert_eq!(decoded_contents(&root), Value::Double(123.5));
    }

    #[test]
    fn test_decode_ns_number() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSNumber", 0x00);
        class_link(&mut payload, b"NSValue", 0x00);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        // a "*" type encoding string, then one value of that type
        payload.extend_from_slice(&[0x84, 0x01, 0x2A]);
        payload.extend_from_slice(&[0x84, 0x84, 0x01]);
        payload.extend_from_slice(b"i");
        payload.extend_from_slice(&[0x97, 0x2A]);
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let root = unarchive_from_bytes(&bytes).unwrap();

        assert_eq!(decoded_contents(&root), Value::SignedInteger(42));
    }

    #[test]
    fn test_decode_empty_ns_set() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSSet", 0x00);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        payload.extend_from_slice(&[0x84, 0x01, 0x49, 0x00]);
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let root = unarchive_from_bytes(&bytes).unwrap();

        assert_eq!(decoded_contents(&root), Value::Array(vec![]));
    }

    #[test]
    fn test_unsupported_class_version_attaches_class_chain() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        class_link(&mut payload, b"NSString", 0x02);
        class_link(&mut payload, b"NSObject", 0x00);
        payload.push(0x85);
        payload.extend_from_slice(&[0x84, 0x01, 0x2B, 0x03]);
        payload.extend_from_slice(b"abc");
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let result = unarchive_from_bytes(&bytes);

        let Err(ArchiveError::ClassDecoderFailed { class, source }) = result else {
            panic!("expected a class decoder failure");
        };
        assert!(class.contains("NSString v2"));
        assert!(class.contains("NSObject v0"));
        assert_eq!(
            *source,
            ArchiveError::UnsupportedClassVersion {
                class: "NSString".to_string(),
                version: 2,
            }
        );
    }
}
