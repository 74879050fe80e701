/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to manipulate the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to decode the JPEG image.
    #[error("Error with Jpeg decoding. {0}")]
    JpegDecodingError(#[from] zune_jpeg::errors::DecodeErrors),

    /// Error to encode the JPEG image.
    #[error("Error with Jpeg encoding. {0}")]
    JpegEncodingError(#[from] jpeg_encoder::EncodingError),

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(#[from] png::EncodingError),

    /// The image buffer does not match the declared dimensions.
    #[error("Buffer of {0} bytes does not fit {1}x{2} with {3} channels")]
    InvalidImageBuffer(usize, usize, usize, usize),

    /// A required capture metadata tag is missing from the image.
    #[error("Missing capture metadata tag: {0}")]
    MissingMetadataTag(&'static str),

    /// A capture metadata tag carries a non-numeric value.
    #[error("Malformed capture metadata tag: {0}")]
    MalformedMetadataTag(&'static str),
}
