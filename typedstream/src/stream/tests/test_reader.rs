#[cfg(test)]
mod reader_tests {
    use std::rc::Rc;

    use crate::encoding::Encoding;
    use crate::error::stream::StreamError;
    use crate::stream::{
        events::{ByteOrder, Event, Reference, ReferenceKind},
        reader::TypedStreamReader,
    };

    /// A little-endian header (streamer version 4, system version 1000)
    /// followed by the given payload.
    fn stream_le(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x04, 0x0B];
        bytes.extend_from_slice(b"streamtyped");
        bytes.extend_from_slice(&[0x81, 0xE8, 0x03]);
        bytes.extend_from_slice(payload);
        bytes
    }

    /// The big-endian counterpart of [`stream_le`].
    fn stream_be(payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x04, 0x0B];
        bytes.extend_from_slice(b"typedstream");
        bytes.extend_from_slice(&[0x81, 0x03, 0xE8]);
        bytes.extend_from_slice(payload);
        bytes
    }

    fn events(bytes: &[u8]) -> Vec<Event> {
        TypedStreamReader::new(bytes)
            .unwrap()
            .collect::<Result<Vec<Event>, StreamError>>()
            .unwrap()
    }

    fn shared(bytes: &[u8]) -> Rc<[u8]> {
        Rc::from(bytes)
    }

    #[test]
    fn test_parse_header() {
        let bytes = stream_le(&[]);

        let reader = TypedStreamReader::new(&bytes).unwrap();

        assert_eq!(reader.streamer_version(), 4);
        assert_eq!(reader.byte_order(), ByteOrder::Little);
        assert_eq!(reader.system_version(), 1000);
        assert_eq!(
            events(&bytes),
            vec![Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            }]
        );
    }

    #[test]
    fn test_parse_big_endian_header() {
        let bytes = stream_be(&[]);

        let reader = TypedStreamReader::new(&bytes).unwrap();

        assert_eq!(reader.byte_order(), ByteOrder::Big);
        assert_eq!(reader.system_version(), 1000);
    }

    #[test]
    fn test_reject_old_nextstep_streamer_version() {
        let mut bytes = stream_le(&[]);
        bytes[0] = 0x03;

        let result = TypedStreamReader::new(&bytes);

        assert_eq!(
            result.unwrap_err(),
            StreamError::UnsupportedStreamerVersion(3)
        );
    }

    #[test]
    fn test_reject_unknown_streamer_version() {
        let mut bytes = stream_le(&[]);
        bytes[0] = 0x05;

        let result = TypedStreamReader::new(&bytes);

        assert_eq!(
            result.unwrap_err(),
            StreamError::UnsupportedStreamerVersion(5)
        );
    }

    #[test]
    fn test_reject_unknown_signature() {
        let mut bytes = stream_le(&[]);
        bytes[12] = b'x';

        let result = TypedStreamReader::new(&bytes);

        assert!(matches!(
            result,
            Err(StreamError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_reject_bad_signature_length() {
        let mut bytes = stream_le(&[]);
        bytes[1] = 0x0A;

        let result = TypedStreamReader::new(&bytes);

        assert!(matches!(
            result,
            Err(StreamError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_parse_string_archive() {
        // An NSString archived as the single root value
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        payload.extend_from_slice(&[0x84, 0x84, 0x08]);
        payload.extend_from_slice(b"NSString");
        payload.push(0x01);
        payload.extend_from_slice(&[0x84, 0x84, 0x08]);
        payload.extend_from_slice(b"NSObject");
        payload.extend_from_slice(&[0x00, 0x85]);
        payload.extend_from_slice(&[0x84, 0x01, 0x2B, 0x0C]);
        payload.extend_from_slice(b"string value");
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        let expected = vec![
            Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            },
            Event::BeginTypedValues(vec![Encoding::Object]),
            Event::BeginObject { number: 0 },
            Event::SingleClass {
                name: shared(b"NSString"),
                version: 1,
                number: 0,
            },
            Event::SingleClass {
                name: shared(b"NSObject"),
                version: 0,
                number: 1,
            },
            Event::Nil,
            Event::BeginTypedValues(vec![Encoding::Bytes]),
            Event::Bytes(b"string value".to_vec()),
            Event::EndTypedValues,
            Event::EndObject,
            Event::EndTypedValues,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_every_begin_has_matching_end() {
        let mut payload = vec![0x84, 0x01, 0x40];
        payload.push(0x84);
        payload.extend_from_slice(&[0x84, 0x84, 0x08]);
        payload.extend_from_slice(b"NSString");
        payload.push(0x01);
        payload.extend_from_slice(&[0x84, 0x84, 0x08]);
        payload.extend_from_slice(b"NSObject");
        payload.extend_from_slice(&[0x00, 0x85]);
        payload.extend_from_slice(&[0x84, 0x01, 0x2B, 0x0C]);
        payload.extend_from_slice(b"string value");
        payload.push(0x86);
        let bytes = stream_le(&payload);

        let mut depth = 0i32;
        for event in events(&bytes) {
            if event.closes_nesting() {
                depth -= 1;
            }
            assert!(depth >= 0, "nesting went negative at {event:?}");
            if event.opens_nesting() {
                depth += 1;
            }
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn test_parse_array_of_integers() {
        // [2i] holding 42 and -7
        let mut payload = vec![0x84, 0x04];
        payload.extend_from_slice(b"[2i]");
        payload.extend_from_slice(&[0x2A, 0xF9]);
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        let expected = vec![
            Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            },
            Event::BeginTypedValues(vec![Encoding::Array {
                length: 2,
                element: Box::new(Encoding::Int),
            }]),
            Event::BeginArray {
                element: Encoding::Int,
                length: 2,
            },
            Event::SignedInteger(42),
            Event::SignedInteger(-7),
            Event::EndArray,
            Event::EndTypedValues,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_anonymous_struct_of_floats() {
        // {?=ff} holding 1.5 and 2.5
        let mut payload = vec![0x84, 0x06];
        payload.extend_from_slice(b"{?=ff}");
        payload.push(0x83);
        payload.extend_from_slice(&1.5f32.to_le_bytes());
        payload.push(0x83);
        payload.extend_from_slice(&2.5f32.to_le_bytes());
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        let expected = vec![
            Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            },
            Event::BeginTypedValues(vec![Encoding::Struct {
                name: "?".to_string(),
                fields: vec![Encoding::Float, Encoding::Float],
            }]),
            Event::BeginStruct {
                name: "?".to_string(),
                fields: vec![Encoding::Float, Encoding::Float],
            },
            Event::Float(1.5),
            Event::Float(2.5),
            Event::EndStruct,
            Event::EndTypedValues,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_two_byte_integer_decodes_negative() {
        // 0x81 FF FF is -1 regardless of byte order
        let payload = [0x84, 0x01, 0x73, 0x81, 0xFF, 0xFF];

        let little = events(&stream_le(&payload));
        let big = events(&stream_be(&payload));

        assert!(little.contains(&Event::SignedInteger(-1)));
        assert!(big.contains(&Event::SignedInteger(-1)));
    }

    #[test]
    fn test_four_byte_integer_honors_byte_order() {
        let payload = [0x84, 0x01, 0x69, 0x82, 0x00, 0x00, 0x01, 0x00];

        let big = events(&stream_be(&payload));
        let little = events(&stream_le(&payload));

        assert!(big.contains(&Event::SignedInteger(256)));
        assert!(little.contains(&Event::SignedInteger(65536)));
    }

    #[test]
    fn test_chars_are_stored_literally() {
        // c and C never use head tags, even for values in the tag range
        let payload = [0x84, 0x02, 0x63, 0x43, 0x85, 0x85];
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        assert!(result.contains(&Event::SignedInteger(-123)));
        assert!(result.contains(&Event::UnsignedInteger(0x85)));
    }

    #[test]
    fn test_repeated_encoding_is_referenced() {
        // Two "i" groups; the second reuses string #0 by reference
        let payload = [0x84, 0x01, 0x69, 0x05, 0x92, 0x07];
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        let expected = vec![
            Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            },
            Event::BeginTypedValues(vec![Encoding::Int]),
            Event::SignedInteger(5),
            Event::EndTypedValues,
            Event::BeginTypedValues(vec![Encoding::Int]),
            Event::SignedInteger(7),
            Event::EndTypedValues,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_c_string_literal_and_reference() {
        // Two "*" groups holding the same string: a literal, then a reference
        let mut payload = vec![0x84, 0x01, 0x2A];
        payload.extend_from_slice(&[0x84, 0x84, 0x03]);
        payload.extend_from_slice(b"abc");
        payload.extend_from_slice(&[0x92, 0x93]);
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        let expected = vec![
            Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            },
            Event::BeginTypedValues(vec![Encoding::CString]),
            Event::CString {
                contents: shared(b"abc"),
                number: Some(1),
            },
            Event::EndTypedValues,
            Event::BeginTypedValues(vec![Encoding::CString]),
            Event::Reference(Reference {
                kind: ReferenceKind::CString,
                number: 1,
            }),
            Event::EndTypedValues,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_parse_selector_and_nil_selector() {
        let mut payload = vec![0x84, 0x02, 0x3A, 0x3A];
        payload.extend_from_slice(&[0x84, 0x04]);
        payload.extend_from_slice(b"init");
        payload.push(0x85);
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        assert!(result.contains(&Event::Selector(Some(shared(b"init")))));
        assert!(result.contains(&Event::Selector(None)));
    }

    #[test]
    fn test_byte_arrays_are_read_at_once() {
        let payload = [0x84, 0x04, 0x5B, 0x33, 0x63, 0x5D, 0x01, 0x02, 0x03];
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        assert!(result.contains(&Event::ByteArray {
            element: Encoding::Char,
            data: vec![0x01, 0x02, 0x03],
        }));
        assert!(!result.iter().any(|event| matches!(event, Event::BeginArray { .. })));
    }

    #[test]
    fn test_nil_object_is_an_event_not_an_error() {
        let payload = [0x84, 0x01, 0x40, 0x85];
        let bytes = stream_le(&payload);

        let result = events(&bytes);

        let expected = vec![
            Event::Header {
                streamer_version: 4,
                byte_order: ByteOrder::Little,
                system_version: 1000,
            },
            Event::BeginTypedValues(vec![Encoding::Object]),
            Event::Nil,
            Event::EndTypedValues,
        ];

        assert_eq!(result, expected);
    }

    #[test]
    fn test_value_out_of_range_for_short() {
        // 65536 does not fit the declared "s"
        let payload = [0x84, 0x01, 0x73, 0x82, 0x00, 0x00, 0x01, 0x00];
        let bytes = stream_le(&payload);

        let mut reader = TypedStreamReader::new(&bytes).unwrap();
        reader.next();
        reader.next();

        assert_eq!(
            reader.next(),
            Some(Err(StreamError::ValueOutOfRange {
                encoding: 's',
                value: 65536,
            }))
        );
    }

    #[test]
    fn test_float_tag_is_malformed_for_integers() {
        let payload = [0x84, 0x01, 0x69, 0x83, 0x00, 0x00, 0x00, 0x00];
        let bytes = stream_le(&payload);

        let mut reader = TypedStreamReader::new(&bytes).unwrap();
        reader.next();
        reader.next();

        assert!(matches!(
            reader.next(),
            Some(Err(StreamError::MalformedHead { head: 0x83, .. }))
        ));
    }

    #[test]
    fn test_forward_reference_is_fatal_and_reader_stops() {
        // The first group's encoding is a reference, but nothing was interned
        let payload = [0x92];
        let bytes = stream_le(&payload);

        let mut reader = TypedStreamReader::new(&bytes).unwrap();
        assert!(matches!(reader.next(), Some(Ok(Event::Header { .. }))));
        assert_eq!(
            reader.next(),
            Some(Err(StreamError::UnknownReference {
                kind: ReferenceKind::CString,
                number: 0,
            }))
        );
        // The state machine does not advance past an error
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn test_pointer_encoding_is_unsupported() {
        let payload = [0x84, 0x02, 0x5E, 0x69, 0x05];
        let bytes = stream_le(&payload);

        let mut reader = TypedStreamReader::new(&bytes).unwrap();
        reader.next();
        reader.next();

        assert_eq!(
            reader.next(),
            Some(Err(StreamError::UnsupportedType("^i".to_string())))
        );
    }

    #[test]
    fn test_bitfield_encoding_is_unsupported() {
        let payload = [0x84, 0x02, 0x62, 0x38, 0x05];
        let bytes = stream_le(&payload);

        let mut reader = TypedStreamReader::new(&bytes).unwrap();
        reader.next();
        reader.next();

        assert_eq!(
            reader.next(),
            Some(Err(StreamError::UnsupportedType("b8".to_string())))
        );
    }

    #[test]
    fn test_truncated_string_reports_offset() {
        // A string claiming five bytes with only two in the stream
        let payload = [0x84, 0x05, 0x61, 0x62];
        let bytes = stream_le(&payload);

        let mut reader = TypedStreamReader::new(&bytes).unwrap();
        reader.next();

        assert_eq!(
            reader.next(),
            Some(Err(StreamError::Truncated {
                offset: 18,
                needed: 3,
            }))
        );
    }
}
