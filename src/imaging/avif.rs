//! AVIF support outside the `image` crate.
//!
//! The `image` crate's `"avif"` feature only compiles the encoder (rav1e);
//! its decoder needs the C library dav1d. Reading AVIF therefore goes through
//! `avif-parse` for the container and `rav1d`, the pure Rust port of dav1d,
//! for the AV1 payload. The decoded YUV planes are converted to RGB8 here.
//!
//! Only the primary item's colour planes are decoded; an alpha item is
//! ignored.

use super::backend::BackendError;
use crate::types::Dimensions;
use image::{DynamicImage, RgbImage};
use std::path::Path;

fn parse(path: &Path) -> Result<avif_parse::AvifData, BackendError> {
    let file_data = std::fs::read(path)?;
    avif_parse::read_avif(&mut std::io::Cursor::new(&file_data))
        .map_err(|e| BackendError::decode(path, format!("{e:?}")))
}

/// Read dimensions from the container metadata without decoding pixels.
pub fn identify(path: &Path) -> Result<Dimensions, BackendError> {
    let meta = parse(path)?
        .primary_item_metadata()
        .map_err(|e| BackendError::decode(path, format!("{e:?}")))?;
    Ok(Dimensions::new(
        meta.max_frame_width.get(),
        meta.max_frame_height.get(),
    ))
}

/// Decode the primary image of an AVIF file to RGB8.
pub fn decode(path: &Path) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib::{
        dav1d_close, dav1d_data_create, dav1d_data_unref, dav1d_default_settings,
        dav1d_get_picture, dav1d_open, dav1d_picture_unref, dav1d_send_data,
    };
    use std::mem::MaybeUninit;
    use std::ptr::NonNull;

    let avif = parse(path)?;
    let av1_bytes: &[u8] = &avif.primary_item;

    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    unsafe { dav1d_default_settings(NonNull::from(&mut settings).cast::<Dav1dSettings>()) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(BackendError::decode(path, format!("rav1d open failed ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf_ptr = unsafe { dav1d_data_create(NonNull::new(&mut data), av1_bytes.len()) };
    if buf_ptr.is_null() {
        unsafe { dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::decode(path, "rav1d data_create failed"));
    }
    unsafe { std::ptr::copy_nonoverlapping(av1_bytes.as_ptr(), buf_ptr, av1_bytes.len()) };

    let rc = unsafe { dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d_data_unref(NonNull::new(&mut data));
            dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(BackendError::decode(path, format!("rav1d send_data failed ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d_close(NonNull::new(&mut ctx)) };
        return Err(BackendError::decode(path, format!("rav1d get_picture failed ({})", rc.0)));
    }

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let layout = pic.p.layout;
    let subsampling = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some((false, false)),
        DAV1D_PIXEL_LAYOUT_I420 => Some((true, true)),
        DAV1D_PIXEL_LAYOUT_I422 => Some((true, false)),
        DAV1D_PIXEL_LAYOUT_I444 => Some((false, false)),
        _ => None,
    };
    let monochrome = layout == DAV1D_PIXEL_LAYOUT_I400;
    let y_plane = pic.data[0];
    let (u_plane, v_plane) = if monochrome {
        (y_plane, y_plane)
    } else {
        (pic.data[1], pic.data[2])
    };

    let rgb = match (subsampling, y_plane, u_plane, v_plane) {
        (Some((ss_x, ss_y)), Some(y), Some(u), Some(v)) => Ok(YuvPlanes {
            y_ptr: y.as_ptr() as *const u8,
            u_ptr: u.as_ptr() as *const u8,
            v_ptr: v.as_ptr() as *const u8,
            y_stride: pic.stride[0],
            uv_stride: if monochrome { 0 } else { pic.stride[1] },
            width,
            height,
            bpc: pic.p.bpc as u32,
            ss_x,
            ss_y,
            monochrome,
        }
        .to_rgb()),
        (None, ..) => Err(BackendError::decode(
            path,
            format!("unsupported AVIF pixel layout {layout}"),
        )),
        _ => Err(BackendError::decode(path, "rav1d returned no picture data")),
    };

    unsafe {
        dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d_close(NonNull::new(&mut ctx));
    }

    RgbImage::from_raw(width, height, rgb?)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::decode(path, "decoded AVIF planes do not match its size"))
}

/// Borrowed YUV planes of a decoded picture.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    /// Chroma subsampling: horizontal, vertical (I420 = true, true)
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    /// Convert to interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = vec![0u8; self.width as usize * self.height as usize * 3];

        for row in 0..self.height {
            for col in 0..self.width {
                let y_val = read_sample(self.y_ptr, self.y_stride, col, row, self.bpc);

                let (r, g, b) = if self.monochrome {
                    let v = (y_val * scale).clamp(0.0, 255.0);
                    (v, v, v)
                } else {
                    let u_col = if self.ss_x { col / 2 } else { col };
                    let u_row = if self.ss_y { row / 2 } else { row };
                    let cb = read_sample(self.u_ptr, self.uv_stride, u_col, u_row, self.bpc);
                    let cr = read_sample(self.v_ptr, self.uv_stride, u_col, u_row, self.bpc);
                    let (cb, cr) = (cb - center, cr - center);
                    (
                        ((y_val + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((y_val - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((y_val + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    )
                };

                let idx = (row as usize * self.width as usize + col as usize) * 3;
                rgb[idx] = r as u8;
                rgb[idx + 1] = g as u8;
                rgb[idx + 2] = b as u8;
            }
        }

        rgb
    }
}

/// One sample from a plane. Depths above 8 bits are stored as u16.
#[inline]
fn read_sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let byte_offset = y as isize * stride + x as isize * 2;
        (unsafe { (ptr.offset(byte_offset) as *const u16).read_unaligned() }) as f32
    }
}
