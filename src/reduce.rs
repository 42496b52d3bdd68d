//! Frame reducer: collapses a decoded frame into brightness or per-channel averages

use bytes::Bytes;

use crate::error::PixelBufferError;

/// Reading reported when no frame could be captured or decoded
pub const SENTINEL: i32 = -1;

/// Interleaved 8-bit pixels in B, G, R order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Bytes,
}

impl PixelBuffer {
    /// Wrap bytes already laid out as B, G, R triples.
    pub fn new(data: impl Into<Bytes>) -> Result<Self, PixelBufferError> {
        let data = data.into();
        if data.len() % 3 != 0 {
            return Err(PixelBufferError::Ragged(data.len()));
        }
        Ok(Self { data })
    }

    /// Repack R, G, B triples (what image decoders hand out) into B, G, R order.
    pub fn from_rgb(rgb: &[u8]) -> Result<Self, PixelBufferError> {
        if rgb.len() % 3 != 0 {
            return Err(PixelBufferError::Ragged(rgb.len()));
        }
        let mut bgr = Vec::with_capacity(rgb.len());
        for px in rgb.chunks_exact(3) {
            bgr.extend_from_slice(&[px[2], px[1], px[0]]);
        }
        Ok(Self { data: bgr.into() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// What a single reduction pass produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceMode {
    Luminance,
    Rgb,
}

/// Per-channel averages, kept in capture order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelAverages {
    pub b: i32,
    pub g: i32,
    pub r: i32,
}

impl ChannelAverages {
    pub const SENTINEL: Self = Self {
        b: SENTINEL,
        g: SENTINEL,
        r: SENTINEL,
    };

    pub fn is_sentinel(&self) -> bool {
        *self == Self::SENTINEL
    }

    /// `floor(R*0.3 + G*0.6 + B*0.1)`, evaluated in integers so the floor is exact.
    pub fn luminance(&self) -> i32 {
        if self.is_sentinel() {
            return SENTINEL;
        }
        (3 * self.r + 6 * self.g + self.b) / 10
    }

    /// Values in the order they are pushed to the interpreter: B, G, R.
    pub fn to_array(self) -> [i32; 3] {
        [self.b, self.g, self.r]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Luminance(i32),
    Rgb(ChannelAverages),
}

impl Reduction {
    pub fn sentinel(mode: ReduceMode) -> Self {
        match mode {
            ReduceMode::Luminance => Reduction::Luminance(SENTINEL),
            ReduceMode::Rgb => Reduction::Rgb(ChannelAverages::SENTINEL),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        match self {
            Reduction::Luminance(value) => *value == SENTINEL,
            Reduction::Rgb(averages) => averages.is_sentinel(),
        }
    }
}

/// Reduce a frame in one pass. An absent or zero-pixel buffer yields the sentinel for `mode`.
pub fn reduce(buffer: Option<&PixelBuffer>, mode: ReduceMode) -> Reduction {
    let Some(averages) = buffer.and_then(channel_averages) else {
        return Reduction::sentinel(mode);
    };

    match mode {
        ReduceMode::Luminance => Reduction::Luminance(averages.luminance()),
        ReduceMode::Rgb => Reduction::Rgb(averages),
    }
}

fn channel_averages(buffer: &PixelBuffer) -> Option<ChannelAverages> {
    let count = buffer.pixel_count() as u64;
    if count == 0 {
        return None;
    }

    let (mut b, mut g, mut r) = (0u64, 0u64, 0u64);
    for px in buffer.as_bytes().chunks_exact(3) {
        b += u64::from(px[0]);
        g += u64::from(px[1]);
        r += u64::from(px[2]);
    }

    // Each quotient is at most 255.
    Some(ChannelAverages {
        b: (b / count) as i32,
        g: (g / count) as i32,
        r: (r / count) as i32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(bytes: &[u8]) -> PixelBuffer {
        PixelBuffer::new(bytes.to_vec()).unwrap()
    }

    #[test]
    fn uniform_frame() {
        let buf = buffer(&[10, 20, 30, 10, 20, 30]);

        assert_eq!(
            reduce(Some(&buf), ReduceMode::Rgb),
            Reduction::Rgb(ChannelAverages { b: 10, g: 20, r: 30 })
        );
        assert_eq!(reduce(Some(&buf), ReduceMode::Luminance), Reduction::Luminance(22));
    }

    #[test]
    fn averages_truncate() {
        // b: 255 / 2, g: 3 / 2, r: 15 / 2
        let buf = buffer(&[0, 1, 7, 255, 2, 8]);
        let Reduction::Rgb(avg) = reduce(Some(&buf), ReduceMode::Rgb) else {
            panic!("expected rgb reduction");
        };
        assert_eq!(avg.to_array(), [127, 1, 7]);
    }

    #[test]
    fn absent_buffer_is_sentinel() {
        assert_eq!(reduce(None, ReduceMode::Luminance), Reduction::Luminance(-1));
        assert_eq!(
            reduce(None, ReduceMode::Rgb),
            Reduction::Rgb(ChannelAverages { b: -1, g: -1, r: -1 })
        );
    }

    #[test]
    fn empty_buffer_is_sentinel() {
        let buf = buffer(&[]);
        assert!(buf.is_empty());
        assert_eq!(reduce(Some(&buf), ReduceMode::Luminance), Reduction::Luminance(-1));
        assert_eq!(
            reduce(Some(&buf), ReduceMode::Rgb),
            Reduction::Rgb(ChannelAverages::SENTINEL)
        );
    }

    #[test]
    fn luminance_matches_rgb_averages() {
        let frames: [&[u8]; 4] = [
            &[255, 255, 255],
            &[0, 0, 0, 0, 0, 0],
            &[12, 200, 97, 45, 3, 251, 130, 130, 9],
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
        ];

        for bytes in frames {
            let buf = buffer(bytes);
            let Reduction::Rgb(avg) = reduce(Some(&buf), ReduceMode::Rgb) else {
                panic!("expected rgb reduction");
            };
            let weighted =
                f64::from(avg.r) * 0.3 + f64::from(avg.g) * 0.6 + f64::from(avg.b) * 0.1;
            let expected = weighted.floor() as i32;
            // Float weights can land a hair under an integer; allow for that only.
            let Reduction::Luminance(lum) = reduce(Some(&buf), ReduceMode::Luminance) else {
                panic!("expected luminance reduction");
            };
            assert!(lum == expected || lum == expected + 1, "{lum} vs {expected}");
            assert_eq!(lum, avg.luminance());
            for channel in avg.to_array() {
                assert!((0..=255).contains(&channel));
            }
        }
    }

    #[test]
    fn white_frame_is_full_scale() {
        let buf = buffer(&[255; 300]);
        assert_eq!(reduce(Some(&buf), ReduceMode::Luminance), Reduction::Luminance(255));
    }

    #[test]
    fn repeated_reduction_is_stable() {
        let buf = buffer(&[9, 80, 201, 33, 4, 17]);
        for mode in [ReduceMode::Luminance, ReduceMode::Rgb] {
            assert_eq!(reduce(Some(&buf), mode), reduce(Some(&buf), mode));
        }
    }

    #[test]
    fn ragged_buffer_rejected() {
        assert_eq!(
            PixelBuffer::new(vec![1u8, 2, 3, 4]),
            Err(PixelBufferError::Ragged(4))
        );
        assert_eq!(PixelBuffer::from_rgb(&[1, 2]), Err(PixelBufferError::Ragged(2)));
    }

    #[test]
    fn rgb_input_is_repacked() {
        let buf = PixelBuffer::from_rgb(&[30, 20, 10, 31, 21, 11]).unwrap();
        assert_eq!(buf.as_bytes(), &[10, 20, 30, 11, 21, 31]);
        assert_eq!(buf.pixel_count(), 2);
    }

    #[test]
    fn sentinel_reductions() {
        assert!(Reduction::sentinel(ReduceMode::Rgb).is_sentinel());
        assert!(Reduction::sentinel(ReduceMode::Luminance).is_sentinel());
        assert!(!Reduction::Luminance(0).is_sentinel());
        assert_eq!(ChannelAverages::SENTINEL.luminance(), SENTINEL);
    }
}
