#[cfg(test)]
mod byte_reader_tests {
    use crate::error::stream::StreamError;
    use crate::stream::{byte_reader::ByteReader, events::ByteOrder};

    #[test]
    fn test_read_exact_tracks_position() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut reader = ByteReader::new(&data);

        assert_eq!(reader.read_exact(2).unwrap(), &[0x01, 0x02]);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_u8().unwrap(), 0x03);
        assert_eq!(reader.position(), 3);
        assert!(!reader.is_at_end());
        assert_eq!(reader.read_u8().unwrap(), 0x04);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_read_past_end_reports_offset() {
        let data = [0x01, 0x02];
        let mut reader = ByteReader::new(&data);
        reader.read_u8().unwrap();

        let result = reader.read_exact(4);

        assert_eq!(
            result.unwrap_err(),
            StreamError::Truncated {
                offset: 1,
                needed: 3,
            }
        );
        // A failed read does not consume anything
        assert_eq!(reader.position(), 1);
    }

    #[test]
    fn test_multi_byte_reads_honor_byte_order() {
        let data = [0x00, 0x01, 0x00, 0x01];
        let mut reader = ByteReader::new(&data);

        reader.set_byte_order(ByteOrder::Big);
        assert_eq!(reader.read_u16().unwrap(), 1);

        reader.set_byte_order(ByteOrder::Little);
        assert_eq!(reader.read_u16().unwrap(), 256);
    }

    #[test]
    fn test_signed_and_float_reads() {
        let mut data = vec![0xFF, 0xFF];
        data.extend_from_slice(&1.5f32.to_le_bytes());
        data.extend_from_slice(&(-2.5f64).to_le_bytes());
        let mut reader = ByteReader::new(&data);
        reader.set_byte_order(ByteOrder::Little);

        assert_eq!(reader.read_i16().unwrap(), -1);
        assert_eq!(reader.read_f32().unwrap(), 1.5);
        assert_eq!(reader.read_f64().unwrap(), -2.5);
        assert!(reader.is_at_end());
    }
}
