//! Handles a single remote driver request
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};

use clap::Parser;

use crate::error::FabricNetResult;
use crate::wrap;

use super::Config;

#[derive(Parser, Debug)]
pub struct Call {
    /// Driver method, e.g. NetworkDriver.CreateNetwork
    method: String,
    /// Instead of reading from STDIN, read the request from the given file.
    #[clap(short, long)]
    file: Option<OsString>,
}

impl Call {
    fn read_request(&self) -> FabricNetResult<String> {
        match &self.file {
            Some(path) => wrap!(
                fs::read_to_string(path),
                format!("read request file {:?}", path)
            ),
            None => {
                let mut body = String::new();
                wrap!(io::stdin().read_to_string(&mut body), "read request from stdin")?;
                Ok(body)
            }
        }
    }

    pub fn exec(&self, config: &Config) -> FabricNetResult<()> {
        let body = self.read_request()?;
        let plugin = config.build_plugin()?;
        let out = plugin.dispatch(&self.method, &body)?;
        println!("{out}");
        Ok(())
    }
}
