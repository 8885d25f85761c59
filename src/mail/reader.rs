//-
// Copyright (c) 2026, the Confstore developers
//
// This file is part of Confstore.
//
// Confstore is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Confstore is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with Confstore. If not, see <http://www.gnu.org/licenses/>.

//! Thin wrapper over an IMAP session for reading mail.

use std::net::TcpStream;

use log::info;
use native_tls::TlsStream;
use serde::{Deserialize, Serialize};

use crate::support::error::Error;

fn default_port() -> u16 {
    993
}

fn default_mailbox() -> String {
    "INBOX".to_owned()
}

/// Connection settings for [`EmailReader`].
///
/// Deserializable so it can be read straight out of a config store:
///
/// ```no_run
/// use confstore::mail::{EmailReader, ReaderConfig};
/// use confstore::store::{ConfigStore, JsonConfig};
///
/// let config = JsonConfig::open("/path/to/config.json")?;
/// let reader = EmailReader::connect(&config.get_as::<ReaderConfig>("mail")?)?;
/// # Ok::<(), confstore::Error>(())
/// ```
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ReaderConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    pub pass: String,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
}

/// An authenticated IMAP session with one mailbox selected.
pub struct EmailReader {
    session: imap::Session<TlsStream<TcpStream>>,
}

impl EmailReader {
    /// Connects over TLS, logs in, and selects the configured mailbox.
    pub fn connect(config: &ReaderConfig) -> Result<Self, Error> {
        let tls = native_tls::TlsConnector::builder().build()?;
        let client = imap::connect(
            (config.host.as_str(), config.port),
            config.host.as_str(),
            &tls,
        )?;
        let mut session = client
            .login(&config.user, &config.pass)
            .map_err(|(e, _)| e)?;
        session.select(&config.mailbox)?;
        info!("Selected mailbox {} on {}", config.mailbox, config.host);
        Ok(Self { session })
    }

    /// UIDs of every message in the selected mailbox, ascending.
    pub fn uids(&mut self) -> Result<Vec<u32>, Error> {
        let mut uids: Vec<u32> =
            self.session.uid_search("ALL")?.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    /// The raw header block of one message.
    pub fn header(&mut self, uid: u32) -> Result<String, Error> {
        let fetches =
            self.session.uid_fetch(uid.to_string(), "RFC822.HEADER")?;
        let fetch = fetches.first().ok_or(Error::MessageNotFound(uid))?;
        Ok(String::from_utf8_lossy(fetch.header().unwrap_or(b""))
            .into_owned())
    }

    /// The transfer-decoded text body of one message.
    pub fn plain_text_body(&mut self, uid: u32) -> Result<String, Error> {
        let fetches = self
            .session
            .uid_fetch(uid.to_string(), "(RFC822.HEADER BODY.PEEK[TEXT])")?;
        let fetch = fetches.first().ok_or(Error::MessageNotFound(uid))?;
        let encoding = transfer_encoding(fetch.header().unwrap_or(b""));
        Ok(decode_body(fetch.text().unwrap_or(b""), encoding.as_deref()))
    }

    /// Moves one message to another mailbox.
    pub fn mv(&mut self, uid: u32, mailbox: &str) -> Result<(), Error> {
        self.session.uid_mv(uid.to_string(), mailbox)?;
        Ok(())
    }

    /// Logs out and drops the connection.
    pub fn close(mut self) -> Result<(), Error> {
        self.session.logout()?;
        Ok(())
    }
}

/// Extracts the `Content-Transfer-Encoding` header value, lowercased.
fn transfer_encoding(header: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(header);
    for line in text.lines() {
        if let Some(colon) = line.find(':') {
            let (name, value) = line.split_at(colon);
            if name.trim().eq_ignore_ascii_case("content-transfer-encoding")
            {
                return Some(value[1..].trim().to_ascii_lowercase());
            }
        }
    }
    None
}

/// Decodes `body` according to its transfer encoding. Identity encodings
/// (7bit, 8bit, binary) and anything unrecognized pass through; a body that
/// fails to decode also passes through rather than being lost.
fn decode_body(body: &[u8], encoding: Option<&str>) -> String {
    let decoded = match encoding {
        Some("base64") => {
            let stripped: Vec<u8> = body
                .iter()
                .copied()
                .filter(|b| !b.is_ascii_whitespace())
                .collect();
            base64::decode(&stripped).unwrap_or_else(|_| body.to_vec())
        }
        Some("quoted-printable") => quoted_printable::decode(
            body,
            quoted_printable::ParseMode::Robust,
        )
        .unwrap_or_else(|_| body.to_vec()),
        _ => body.to_vec(),
    };
    String::from_utf8_lossy(&decoded).into_owned()
}
