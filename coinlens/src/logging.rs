//! Tracing subscriber setup
//!
//! `RUST_LOG` wins over the configured level. In the browser, formatted lines
//! go to `console.log` without timestamps.

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(config: &Config) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    #[cfg(target_arch = "wasm32")]
    let builder = builder
        .without_time()
        .with_ansi(false)
        .with_writer(console::ConsoleWriter::default);

    let installed = builder.try_init().is_ok();
    if installed {
        tracing::debug!(environment = %config.environment, level = %config.log_level, "logging initialised");
    }
    installed
}

#[cfg(target_arch = "wasm32")]
#[allow(unsafe_code)]
mod console {
    use std::io;

    use wasm_bindgen::prelude::wasm_bindgen;

    #[wasm_bindgen]
    extern "C" {
        #[wasm_bindgen(js_namespace = console)]
        fn log(line: &str);
    }

    /// Buffers one formatted event and logs it on drop
    #[derive(Default)]
    pub struct ConsoleWriter(Vec<u8>);

    impl io::Write for ConsoleWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for ConsoleWriter {
        fn drop(&mut self) {
            let line = String::from_utf8_lossy(&self.0);
            let line = line.trim_end();
            if !line.is_empty() {
                log(line);
            }
        }
    }
}
