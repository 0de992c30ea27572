//! CRS capability used for the lazily computed node placement.
//!
//! The octree only needs three answers from a CRS: whether it is geocentric,
//! where a point lands once projected to zero elevation, and which rotation
//! aligns local "up" with the vertical at that point.

use glam::{DMat3, DQuat, DVec3};

use crate::error::{PointCloudError, Result};

/// EPSG code of the WGS84 geocentric (ECEF) CRS.
pub const GEOCENTRIC_EPSG: u32 = 4978;

/// Get the EPSG code from a CRS string if it's in `EPSG:<code>` format.
pub fn parse_epsg_code(crs: &str) -> Option<u32> {
  let (authority, code) = crs.split_once(':')?;
  if !authority.eq_ignore_ascii_case("EPSG") {
    return None;
  }
  code.trim().parse::<u32>().ok()
}

pub trait CrsTransform: Send + Sync {
  fn is_geocentric(&self, crs: &str) -> Result<bool>;

  /// `point` projected onto the zero-elevation surface of `crs`.
  fn origin(&self, crs: &str, point: DVec3) -> Result<DVec3>;

  /// Rotation taking local +Z to the vertical at `origin`. Identity for
  /// non-geocentric CRS.
  fn rotation(&self, crs: &str, origin: DVec3) -> Result<DQuat>;
}

/// WGS84 ellipsoid constants.
const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_E2: f64 = WGS84_F * (2.0 - WGS84_F);

/// Geodetic position in radians and meters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Geodetic {
  pub longitude: f64,
  pub latitude: f64,
  pub height: f64,
}

impl Geodetic {
  /// Iterative ECEF → geodetic conversion on the WGS84 ellipsoid.
  pub fn from_ecef(p: DVec3) -> Self {
    let longitude = p.y.atan2(p.x);
    let r = (p.x * p.x + p.y * p.y).sqrt();
    let mut latitude = p.z.atan2(r * (1.0 - WGS84_E2));
    let mut height = 0.0;
    for _ in 0..6 {
      let sin = latitude.sin();
      let n = WGS84_A / (1.0 - WGS84_E2 * sin * sin).sqrt();
      height = if latitude.cos().abs() > 1e-12 {
        r / latitude.cos() - n
      } else {
        p.z.abs() - n * (1.0 - WGS84_E2)
      };
      latitude = p.z.atan2(r * (1.0 - WGS84_E2 * n / (n + height)));
    }
    Self {
      longitude,
      latitude,
      height,
    }
  }

  pub fn to_ecef(self) -> DVec3 {
    let (sin_lat, cos_lat) = self.latitude.sin_cos();
    let (sin_lon, cos_lon) = self.longitude.sin_cos();
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();
    DVec3::new(
      (n + self.height) * cos_lat * cos_lon,
      (n + self.height) * cos_lat * sin_lon,
      (n * (1.0 - WGS84_E2) + self.height) * sin_lat,
    )
  }

  /// East-north-up frame at this position, expressed in ECEF axes.
  pub fn enu_rotation(self) -> DQuat {
    let (sin_lat, cos_lat) = self.latitude.sin_cos();
    let (sin_lon, cos_lon) = self.longitude.sin_cos();
    let east = DVec3::new(-sin_lon, cos_lon, 0.0);
    let north = DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
    let up = DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);
    DQuat::from_mat3(&DMat3::from_cols(east, north, up))
  }
}

/// Default transform: any `EPSG:<code>` CRS, with EPSG:4978 geocentric and
/// everything else treated as projected with a z-up vertical.
#[derive(Clone, Copy, Debug, Default)]
pub struct Wgs84Transform;

impl Wgs84Transform {
  fn code(crs: &str) -> Result<u32> {
    parse_epsg_code(crs).ok_or_else(|| PointCloudError::InvalidCrs(crs.to_string()))
  }
}

impl CrsTransform for Wgs84Transform {
  fn is_geocentric(&self, crs: &str) -> Result<bool> {
    Ok(Self::code(crs)? == GEOCENTRIC_EPSG)
  }

  fn origin(&self, crs: &str, point: DVec3) -> Result<DVec3> {
    if self.is_geocentric(crs)? {
      let geodetic = Geodetic {
        height: 0.0,
        ..Geodetic::from_ecef(point)
      };
      Ok(geodetic.to_ecef())
    } else {
      Ok(DVec3::new(point.x, point.y, 0.0))
    }
  }

  fn rotation(&self, crs: &str, origin: DVec3) -> Result<DQuat> {
    if self.is_geocentric(crs)? {
      Ok(Geodetic::from_ecef(origin).enu_rotation())
    } else {
      Ok(DQuat::IDENTITY)
    }
  }
}
