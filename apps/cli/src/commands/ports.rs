//! 串口列表命令

use anyhow::Result;
use clap::Args;
use lelamp_sdk::serial::{PortInfo, find_default_port, list_ports};

/// 列出可用串口
#[derive(Args, Debug)]
pub struct PortsCommand {
    /// 显示所有串口（默认只显示 USB 串口）
    #[arg(short, long)]
    pub all: bool,
}

impl PortsCommand {
    pub fn execute(self) -> Result<()> {
        let ports: Vec<PortInfo> = list_ports()?
            .into_iter()
            .filter(|p| self.all || p.usb.is_some() || p.looks_like_servo_bus())
            .collect();

        if ports.is_empty() {
            println!("⚠️  未发现串口设备");
            return Ok(());
        }

        let default = find_default_port();
        println!("可用串口:");
        for port in &ports {
            println!("  {}", format_port(port, default.as_deref() == Some(port.name.as_str())));
        }
        Ok(())
    }
}

fn format_port(port: &PortInfo, is_default: bool) -> String {
    let mut line = port.name.clone();
    if let Some((vid, pid)) = port.usb {
        line.push_str(&format!("  [{vid:04x}:{pid:04x}]"));
    }
    if let Some(product) = &port.product {
        line.push_str(&format!("  {product}"));
    }
    if is_default {
        line.push_str("  (默认)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_port() {
        let port = PortInfo {
            name: "/dev/ttyACM0".to_string(),
            usb: Some((0x1a86, 0x55d3)),
            product: Some("USB Single Serial".to_string()),
        };
        assert_eq!(
            format_port(&port, true),
            "/dev/ttyACM0  [1a86:55d3]  USB Single Serial  (默认)"
        );
    }
}
