pub const FORMAT_S8: i32 = 0;
pub const FORMAT_U8: i32 = 1;
pub const FORMAT_S16_LE: i32 = 2;
pub const FORMAT_S16_BE: i32 = 3;
pub const FORMAT_U16_LE: i32 = 4;
pub const FORMAT_U16_BE: i32 = 5;
pub const FORMAT_S24_LE: i32 = 6;
pub const FORMAT_S24_BE: i32 = 7;
pub const FORMAT_U24_LE: i32 = 8;
pub const FORMAT_U24_BE: i32 = 9;
pub const FORMAT_S32_LE: i32 = 10;
pub const FORMAT_S32_BE: i32 = 11;
pub const FORMAT_U32_LE: i32 = 12;
pub const FORMAT_U32_BE: i32 = 13;
pub const FORMAT_FLOAT_LE: i32 = 14;
pub const FORMAT_FLOAT_BE: i32 = 15;
pub const FORMAT_FLOAT64_LE: i32 = 16;
pub const FORMAT_FLOAT64_BE: i32 = 17;

/// Bits a sample occupies in memory. 24 bit formats live in 32 bit slots.
pub fn physical_width(format: i32) -> Option<usize> {
    match format {
        FORMAT_S8 | FORMAT_U8 => Some(8),
        FORMAT_S16_LE | FORMAT_S16_BE | FORMAT_U16_LE | FORMAT_U16_BE => Some(16),
        FORMAT_S24_LE | FORMAT_S24_BE | FORMAT_U24_LE | FORMAT_U24_BE => Some(32),
        FORMAT_S32_LE | FORMAT_S32_BE | FORMAT_U32_LE | FORMAT_U32_BE => Some(32),
        FORMAT_FLOAT_LE | FORMAT_FLOAT_BE => Some(32),
        FORMAT_FLOAT64_LE | FORMAT_FLOAT64_BE => Some(64),
        _ => None,
    }
}

pub fn bytes_per_sample(format: i32) -> Option<usize> {
    physical_width(format).map(|bits| bits / 8)
}

pub fn bytes_per_frame(format: i32, channels: u32) -> Option<usize> {
    bytes_per_sample(format).map(|b| b * channels as usize)
}

pub fn format_mask(format: i32) -> u64 {
    if (0..64).contains(&format) {
        1 << format
    } else {
        0
    }
}

pub(crate) fn cstr_fixed<const N: usize>(buf: &[u8; N]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(N);
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

pub(crate) fn fill_cstr<const N: usize>(dst: &mut [u8; N], src: &str) {
    dst.fill(0);
    let n = src.len().min(N - 1);
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
}
