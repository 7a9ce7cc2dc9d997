use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, StopBits};
use tracing::{debug, info, warn};

use crate::address::{BtAddr, DeviceAddress, SERIAL_PORT_SERVICE_UUID};
use crate::error::{Result, TransportError};
use crate::traits::{Connector, LinkStream};

/// Serial link settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate. RFCOMM ignores it, real UARTs do not.
    pub baud_rate: u32,
    /// Read timeout of the opened port. Readers wake up at least this often.
    pub poll_interval: Duration,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Opens brick links on serial devices.
///
/// Device paths are used as given. Bluetooth addresses must be bound to the
/// device path their RFCOMM channel was attached to (`rfcomm bind 0 <mac>`).
#[derive(Debug, Clone, Default)]
pub struct SerialConnector {
    config: SerialConfig,
    bindings: HashMap<BtAddr, PathBuf>,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self {
            config,
            bindings: HashMap::new(),
        }
    }

    /// Bind a Bluetooth address to a device path.
    pub fn with_binding(mut self, addr: BtAddr, device: impl Into<PathBuf>) -> Self {
        self.bind(addr, device);
        self
    }

    /// Bind a Bluetooth address to a device path.
    pub fn bind(&mut self, addr: BtAddr, device: impl Into<PathBuf>) {
        self.bindings.insert(addr, device.into());
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Map an address to the device path that will be opened.
    pub fn resolve(&self, address: &DeviceAddress) -> Result<PathBuf> {
        let path = match address {
            DeviceAddress::Bluetooth(addr) => {
                if !addr.is_lego() {
                    warn!(%addr, "address is outside the LEGO OUI");
                }
                self.bindings
                    .get(addr)
                    .cloned()
                    .ok_or_else(|| TransportError::DeviceNotFound {
                        address: addr.to_string(),
                    })?
            }
            DeviceAddress::Path(path) => path.clone(),
        };

        if !device_exists(&path) {
            return Err(TransportError::DeviceNotFound {
                address: address.to_string(),
            });
        }
        Ok(path)
    }
}

impl Connector for SerialConnector {
    fn connect(&self, address: &DeviceAddress) -> Result<LinkStream> {
        let device = self.resolve(address)?;
        debug!(
            %address,
            device = %device.display(),
            service = SERIAL_PORT_SERVICE_UUID,
            "opening serial link"
        );

        let port = serialport::new(device.to_string_lossy(), self.config.baud_rate)
            .timeout(self.config.poll_interval)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|source| match source.kind() {
                serialport::ErrorKind::NoDevice => TransportError::DeviceNotFound {
                    address: address.to_string(),
                },
                _ => TransportError::Open {
                    device: device.clone(),
                    source,
                },
            })?;

        info!(%address, device = %device.display(), "serial link open");
        Ok(LinkStream::from_serial(port))
    }
}

#[cfg(unix)]
fn device_exists(path: &Path) -> bool {
    path.exists()
}

// COM port names are not filesystem paths; let the driver decide.
#[cfg(not(unix))]
fn device_exists(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lego_addr() -> BtAddr {
        "00:16:53:01:02:03".parse().unwrap()
    }

    #[test]
    fn unbound_bluetooth_address_not_found() {
        let connector = SerialConnector::default();
        let result = connector.resolve(&DeviceAddress::Bluetooth(lego_addr()));
        assert!(matches!(result, Err(TransportError::DeviceNotFound { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn bound_bluetooth_address_resolves_to_device() {
        let dir = std::env::temp_dir().join(format!("nxtlink-serial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let device = dir.join("rfcomm0");
        std::fs::write(&device, b"").unwrap();

        let connector = SerialConnector::default().with_binding(lego_addr(), &device);
        let resolved = connector
            .resolve(&DeviceAddress::Bluetooth(lego_addr()))
            .unwrap();
        assert_eq!(resolved, device);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn missing_device_path_not_found() {
        let connector = SerialConnector::default();
        let address = DeviceAddress::Path(PathBuf::from("/dev/nxtlink-does-not-exist"));
        let result = connector.connect(&address);
        assert!(matches!(result, Err(TransportError::DeviceNotFound { .. })));
    }

    #[test]
    fn default_config_polls_quickly() {
        let cfg = SerialConfig::default();
        assert_eq!(cfg.baud_rate, 115_200);
        assert!(cfg.poll_interval <= Duration::from_millis(250));
    }
}
