/// Extracted color info
///
/// Emitted as a three element array of the red, green, and blue channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    /// Red channel
    pub r: u32,

    /// Green channel
    pub g: u32,

    /// Blue channel
    pub b: u32,
}
