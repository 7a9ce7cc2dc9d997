use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::TransportError;

/// Service class UUID of the Bluetooth serial port profile the brick exposes.
pub const SERIAL_PORT_SERVICE_UUID: &str = "00001101-0000-1000-8000-00805F9B34FB";

/// The only OUI registered to LEGO.
pub const LEGO_OUI: [u8; 3] = [0x00, 0x16, 0x53];

/// A Bluetooth device address (`00:16:53:0A:0B:0C`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BtAddr(pub [u8; 6]);

impl BtAddr {
    /// True when the address belongs to LEGO's OUI.
    pub fn is_lego(&self) -> bool {
        self.0[..3] == LEGO_OUI
    }
}

impl fmt::Display for BtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for BtAddr {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut parts = s.split([':', '-']);
        for byte in out.iter_mut() {
            let part = parts
                .next()
                .ok_or_else(|| TransportError::InvalidAddress(s.to_string()))?;
            if part.len() != 2 {
                return Err(TransportError::InvalidAddress(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16)
                .map_err(|_| TransportError::InvalidAddress(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        Ok(Self(out))
    }
}

/// Where to find a brick: a paired Bluetooth address or a serial device path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceAddress {
    Bluetooth(BtAddr),
    Path(PathBuf),
}

impl DeviceAddress {
    /// Device path, when the address already names one.
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            DeviceAddress::Path(path) => Some(path),
            DeviceAddress::Bluetooth(_) => None,
        }
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceAddress::Bluetooth(addr) => write!(f, "{addr}"),
            DeviceAddress::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl FromStr for DeviceAddress {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TransportError::InvalidAddress(s.to_string()));
        }
        match s.parse::<BtAddr>() {
            Ok(addr) => Ok(DeviceAddress::Bluetooth(addr)),
            Err(_) => Ok(DeviceAddress::Path(PathBuf::from(s))),
        }
    }
}

impl From<BtAddr> for DeviceAddress {
    fn from(addr: BtAddr) -> Self {
        DeviceAddress::Bluetooth(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_and_dash_separated_macs() {
        let a: BtAddr = "00:16:53:0a:0B:0c".parse().unwrap();
        let b: BtAddr = "00-16-53-0A-0B-0C".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "00:16:53:0A:0B:0C");
        assert!(a.is_lego());
    }

    #[test]
    fn rejects_malformed_macs() {
        assert!("00:16:53:0a:0b".parse::<BtAddr>().is_err());
        assert!("00:16:53:0a:0b:0c:0d".parse::<BtAddr>().is_err());
        assert!("00:16:53:0a:0b:zz".parse::<BtAddr>().is_err());
        assert!("001:6:53:0a:0b:0c".parse::<BtAddr>().is_err());
    }

    #[test]
    fn non_lego_oui_detected() {
        let addr: BtAddr = "AC:DE:48:00:11:22".parse().unwrap();
        assert!(!addr.is_lego());
    }

    #[test]
    fn device_address_falls_back_to_path() {
        let addr: DeviceAddress = "/dev/rfcomm0".parse().unwrap();
        assert_eq!(addr.as_path(), Some(Path::new("/dev/rfcomm0")));

        let addr: DeviceAddress = "00:16:53:01:02:03".parse().unwrap();
        assert!(matches!(addr, DeviceAddress::Bluetooth(_)));
        assert!(addr.as_path().is_none());
    }

    #[test]
    fn empty_address_rejected() {
        let result = "  ".parse::<DeviceAddress>();
        assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }
}
