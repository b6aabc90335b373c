use super::Backend;
use crate::{Error::OutOfBounds, Result};

/// Class data held in an owned buffer.
#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create a new memory backend
    ///
    /// ## Arguments
    /// * 'data' - The class bytes to take ownership of
    pub fn new(data: Vec<u8>) -> Memory {
        Memory { data }
    }
}

impl Backend for Memory {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(OutOfBounds);
        };

        if offset_end > self.data.len() {
            return Err(OutOfBounds);
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory() {
        let mut data = vec![0x00_u8; 64];
        data[..4].copy_from_slice(&[0xCA, 0xFE, 0xBA, 0xBE]);

        let memory = Memory::new(data);

        assert_eq!(memory.len(), 64);
        assert_eq!(memory.data()[0], 0xCA);
        assert_eq!(memory.data_slice(1, 3).unwrap(), &[0xFE, 0xBA, 0xBE]);
        assert!(memory.data_slice(60, 5).is_err());
        assert!(memory.data_slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_memory_empty_buffer() {
        let memory = Memory::new(vec![]);

        assert_eq!(memory.len(), 0);
        assert!(memory.data_slice(0, 1).is_err());
        assert!(memory.data_slice(1, 0).is_err());
        let empty_slice: &[u8] = &[];
        assert_eq!(memory.data_slice(0, 0).unwrap(), empty_slice);
    }

    #[test]
    fn test_memory_boundaries() {
        let memory = Memory::new(vec![0x42; 10]);

        assert!(matches!(memory.data_slice(10, 1), Err(OutOfBounds)));
        assert!(matches!(memory.data_slice(9, 2), Err(OutOfBounds)));
        assert_eq!(memory.data_slice(9, 1).unwrap(), &[0x42]);
        assert_eq!(memory.data_slice(0, 10).unwrap().len(), 10);
    }
}
