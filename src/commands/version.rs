use crate::error::FabricNetResult;
use clap::Parser;
use serde::Serialize;

#[derive(Parser, Debug)]
pub struct Version {}

#[derive(Debug, Serialize)]
struct Info {
    version: &'static str,
    implements: [&'static str; 2],
}

impl Version {
    pub fn exec(&self) -> FabricNetResult<()> {
        let info = Info {
            version: env!("CARGO_PKG_VERSION"),
            implements: [
                crate::plugin::IMPLEMENTS_NETWORK_DRIVER,
                crate::plugin::IMPLEMENTS_IPAM_DRIVER,
            ],
        };

        let out = serde_json::to_string_pretty(&info)?;
        println!("{out}");

        Ok(())
    }
}
