//! Parses the `nfs://` URI that names the single file this driver fetches.
//!
//! The grammar is deliberately tiny — `nfs://HOST[:PORT]/EXPORT/PATH` — so
//! it's parsed by hand with `str` splitting rather than pulling in a
//! general-purpose URI crate.

use crate::Error;

/// Default Portmap port, used when the URI doesn't specify one.
const DEFAULT_PORTMAP_PORT: u16 = 111;

/// A parsed `nfs://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uri {
    host: String,
    port: u16,
    export: String,
    file_name: String,
}

impl Uri {
    /// Parses `s`, which must have the form `nfs://HOST[:PORT]/EXPORT/PATH`.
    ///
    /// `EXPORT` is everything up to and including the last `/` in the
    /// path; the remainder is the target file's name. An empty host or an
    /// empty (or file-name-less) path is [`Error::InvalidArg`].
    pub fn parse(s: &str) -> Result<Self, Error> {
        let rest = s
            .strip_prefix("nfs://")
            .ok_or(Error::InvalidArg("missing nfs:// scheme"))?;

        let (authority, path) = rest
            .split_once('/')
            .ok_or(Error::InvalidArg("missing path"))?;

        if authority.is_empty() {
            return Err(Error::InvalidArg("missing host"));
        }

        let (host, port) = match authority.split_once(':') {
            Some((h, p)) => {
                let port: u16 = p
                    .parse()
                    .map_err(|_| Error::InvalidArg("invalid port"))?;
                (h, port)
            }
            None => (authority, DEFAULT_PORTMAP_PORT),
        };

        if host.is_empty() {
            return Err(Error::InvalidArg("missing host"));
        }

        if path.is_empty() {
            return Err(Error::InvalidArg("missing path"));
        }

        let split_at = path.rfind('/');
        let (export, file_name) = match split_at {
            Some(i) => (&path[..=i], &path[i + 1..]),
            None => ("", path),
        };

        if file_name.is_empty() {
            return Err(Error::InvalidArg("missing file name"));
        }

        Ok(Uri {
            host: host.to_owned(),
            port,
            export: format!("/{export}"),
            file_name: file_name.to_owned(),
        })
    }

    /// The server host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The portmap port to connect to (defaults to 111).
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The export's directory path, including a leading and trailing `/`.
    pub fn export(&self) -> &str {
        &self.export
    }

    /// The target file's base name, within `export`.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}
