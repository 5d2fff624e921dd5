use std::fmt;

use v4l2_sys::v4l2_frmsizeenum;

use crate::fourcc::FourCC;

const FRMSIZE_TYPE_DISCRETE: u32 = 1;
const FRMSIZE_TYPE_CONTINUOUS: u32 = 2;
const FRMSIZE_TYPE_STEPWISE: u32 = 3;

#[derive(Debug)]
/// Frame size as returned by [`crate::v4l2::vidioc::VIDIOC_ENUM_FRAMESIZES`]
pub struct FrameSize {
    pub index: u32,
    pub fourcc: FourCC,
    pub size: FrameSizeEnum,
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.size.fmt(f)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum FrameSizeEnum {
    Discrete(Discrete),
    Stepwise(Stepwise),
}

impl FrameSizeEnum {
    /// Whether a frame of the given dimensions can be produced
    pub fn contains(&self, width: u32, height: u32) -> bool {
        match self {
            FrameSizeEnum::Discrete(d) => d.width == width && d.height == height,
            FrameSizeEnum::Stepwise(s) => {
                let fits = |v: u32, min: u32, max: u32, step: u32| {
                    v >= min && v <= max && (step == 0 || (v - min) % step == 0)
                };
                fits(width, s.min_width, s.max_width, s.step_width)
                    && fits(height, s.min_height, s.max_height, s.step_height)
            }
        }
    }
}

impl fmt::Display for FrameSizeEnum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameSizeEnum::Discrete(val) => write!(f, "{}", val),
            FrameSizeEnum::Stepwise(val) => write!(f, "{}", val),
        }
    }
}

impl TryFrom<v4l2_frmsizeenum> for FrameSize {
    type Error = String;

    fn try_from(desc: v4l2_frmsizeenum) -> Result<Self, Self::Error> {
        let size = unsafe {
            // union access, discriminated by type_
            match desc.type_ {
                FRMSIZE_TYPE_DISCRETE => FrameSizeEnum::Discrete(Discrete {
                    width: desc.__bindgen_anon_1.discrete.width,
                    height: desc.__bindgen_anon_1.discrete.height,
                }),
                FRMSIZE_TYPE_STEPWISE | FRMSIZE_TYPE_CONTINUOUS => {
                    FrameSizeEnum::Stepwise(Stepwise {
                        min_width: desc.__bindgen_anon_1.stepwise.min_width,
                        max_width: desc.__bindgen_anon_1.stepwise.max_width,
                        step_width: desc.__bindgen_anon_1.stepwise.step_width,
                        min_height: desc.__bindgen_anon_1.stepwise.min_height,
                        max_height: desc.__bindgen_anon_1.stepwise.max_height,
                        step_height: desc.__bindgen_anon_1.stepwise.step_height,
                    })
                }
                typ => return Err(format!("Unknown frame size type: {}", typ)),
            }
        };

        Ok(FrameSize {
            index: desc.index,
            fourcc: FourCC::from(desc.pixel_format),
            size,
        })
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Discrete {
    /// Width of the frame (in pixels).
    pub width: u32,
    /// Height of the frame (in pixels).
    pub height: u32,
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Stepwise {
    pub min_width: u32,
    pub max_width: u32,
    pub step_width: u32,
    pub min_height: u32,
    pub max_height: u32,
    pub step_height: u32,
}

impl fmt::Display for Stepwise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{} - {}x{} (step {}x{})",
            self.min_width,
            self.min_height,
            self.max_width,
            self.max_height,
            self.step_width,
            self.step_height
        )
    }
}
