use thiserror::Error;

use crate::metadata::token::Token;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// # Error Categories
///
/// ## Fatal decode errors
/// - [`Error::InvalidMagic`] - The input does not start with `0xCAFEBABE`
/// - [`Error::Malformed`] - Corrupted or invalid class-file structure
/// - [`Error::OutOfBounds`] - A read went past the logical end of the data
/// - [`Error::InvalidUtf8`] - A modified UTF-8 string could not be decoded
/// - [`Error::HandlerNodeMissing`] - An exception handler starts at an offset that maps to no
///   control-flow node
///
/// ## Symbol resolution
/// - [`Error::InvalidConstant`] - A constant-pool index is out of range or of the wrong kind
///
/// ## Context wrappers
/// - [`Error::MethodDecode`] - Any failure while materializing one method body, tagged with the
///   method's owner, name and descriptor
///
/// # Examples
///
/// ```rust,no_run
/// use cafescope::{ClassFile, Error};
/// use std::path::Path;
///
/// match ClassFile::from_file(Path::new("Foo.class")) {
///     Ok(class) => println!("Loaded {}", class.name()),
///     Err(Error::InvalidMagic(magic)) => eprintln!("Not a class file: 0x{magic:08X}"),
///     Err(Error::Malformed { message, file, line }) => {
///         eprintln!("Malformed class: {} ({}:{})", message, file, line);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The data is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// A read beyond the logical length of the data was attempted.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// A modified UTF-8 sequence had an invalid leading byte or a missing continuation byte.
    #[error("Invalid modified UTF-8 sequence at offset {offset}")]
    InvalidUtf8 {
        /// Offset of the offending byte, relative to the start of the string payload
        offset: usize,
    },

    /// A string does not fit into the u2 byte-length prefix of the modified UTF-8 encoding.
    #[error("String of {0} encoded bytes exceeds the modified UTF-8 length limit")]
    StringTooLong(usize),

    /// The class file does not start with `0xCAFEBABE`.
    #[error("Invalid class file magic - 0x{0:08X}")]
    InvalidMagic(u32),

    /// Provided input was empty.
    #[error("Provided input was empty")]
    Empty,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Generic error for miscellaneous failures.
    #[error("{0}")]
    Error(String),

    /// A constant-pool index is out of range, or refers to an entry of an unexpected kind.
    #[error("Invalid constant pool reference {index} - expected {expected}")]
    InvalidConstant {
        /// The offending index
        index: Token,
        /// The kind of entry the caller required
        expected: &'static str,
    },

    /// Decoding a method body failed.
    ///
    /// `method` carries the fully-qualified name and descriptor, e.g.
    /// `com/example/Foo.bar(I)V`.
    #[error("Failed to decode {method} - {source}")]
    MethodDecode {
        /// Owner, name and descriptor of the method
        method: String,
        /// The underlying failure
        #[source]
        source: Box<Error>,
    },

    /// An exception handler offset maps to no control-flow node.
    #[error("Exception handler at offset {0} has no matching control-flow node")]
    HandlerNodeMissing(u32),

    /// Graph construction or analysis error.
    #[error("{0}")]
    GraphError(String),
}
