use crate::band::Band;
use crate::error::{InputError, KismapError, Result};
use crate::types::{normalize_mac, GeoPoint, Observation};
use rusqlite::{Connection, OpenFlags};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;

const DEVICE_COLUMNS: [&str; 3] = ["devmac", "type", "device"];
const PACKET_COLUMNS: [&str; 6] = ["ts_sec", "sourcemac", "frequency", "signal", "lat", "lon"];

/// Device metadata joined onto packet rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
    pub device_type: Option<String>,
    pub ssid: Option<String>,
}

/// Read-only access to a Kismet `.kismet` capture database
pub struct CaptureReader {
    conn: Connection,
    devices: HashMap<String, DeviceInfo>,
    device_rows: u64,
}

impl CaptureReader {
    /// Open a capture read-only and verify it has the tables we query.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.is_file() {
            return Err(InputError::NotFound(display).into());
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| InputError::NotACapture {
            path: display.clone(),
            reason: e.to_string(),
        })?;

        check_table(&conn, &display, "devices", &DEVICE_COLUMNS)?;
        check_table(&conn, &display, "packets", &PACKET_COLUMNS)?;

        let (devices, device_rows) = load_devices(&conn)?;
        log::info!(
            "Opened capture {}: {} device rows, {} distinct MACs",
            display,
            device_rows,
            devices.len()
        );

        Ok(Self {
            conn,
            devices,
            device_rows,
        })
    }

    /// Number of rows in the capture's devices table
    pub fn device_count(&self) -> u64 {
        self.device_rows
    }

    /// Stream every packet with a signal reading, ordered by capture time.
    ///
    /// Packets without a GPS fix are still visited (with `location: None`).
    /// The visitor may abort the scan by returning an error. Returns the
    /// number of observations visited.
    pub fn scan<F>(&self, mut visit: F) -> Result<u64>
    where
        F: FnMut(Observation) -> Result<()>,
    {
        let mut stmt = self.conn.prepare(
            "SELECT ts_sec, sourcemac, frequency, signal, lat, lon
             FROM packets
             WHERE signal IS NOT NULL AND signal != 0
             ORDER BY ts_sec",
        )?;
        let mut rows = stmt.query([])?;

        let mut visited = 0u64;
        let mut skipped = 0u64;
        while let Some(row) = rows.next()? {
            let raw_mac: Option<String> = row.get(1)?;
            let Some(mac) = raw_mac.as_deref().and_then(normalize_mac) else {
                skipped += 1;
                continue;
            };

            let frequency: Option<f64> = row.get(2)?;
            let frequency = frequency.unwrap_or(0.0);
            let info = self.devices.get(&mac);

            let observation = Observation {
                timestamp: row.get::<_, Option<i64>>(0)?.unwrap_or(0),
                device_type: info.and_then(|d| d.device_type.clone()),
                ssid: info.and_then(|d| d.ssid.clone()),
                mac,
                frequency,
                band: Band::from_frequency(frequency),
                signal: row.get(3)?,
                location: GeoPoint::from_raw(row.get(4)?, row.get(5)?),
            };

            visit(observation)?;
            visited += 1;
        }

        if skipped > 0 {
            log::warn!("Skipped {} packets with a missing or malformed source MAC", skipped);
        }
        log::debug!("Scanned {} packets", visited);

        Ok(visited)
    }
}

fn check_table(
    conn: &Connection,
    path: &str,
    table: &'static str,
    columns: &[&'static str],
) -> Result<()> {
    let not_a_capture = |e: rusqlite::Error| -> KismapError {
        InputError::NotACapture {
            path: path.to_string(),
            reason: e.to_string(),
        }
        .into()
    };

    let mut stmt = conn
        .prepare("SELECT name FROM pragma_table_info(?1)")
        .map_err(not_a_capture)?;
    let present = stmt
        .query_map([table], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect::<rusqlite::Result<Vec<String>>>())
        .map_err(not_a_capture)?;

    if present.is_empty() {
        return Err(InputError::MissingTable(table).into());
    }
    for &column in columns {
        if !present.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            return Err(InputError::MissingColumn { table, column }.into());
        }
    }
    Ok(())
}

fn load_devices(conn: &Connection) -> Result<(HashMap<String, DeviceInfo>, u64)> {
    let mut stmt = conn.prepare("SELECT devmac, type, device FROM devices")?;
    let mut rows = stmt.query([])?;

    let mut devices: HashMap<String, DeviceInfo> = HashMap::new();
    let mut count = 0u64;
    while let Some(row) = rows.next()? {
        count += 1;
        let raw_mac: Option<String> = row.get(0)?;
        let Some(mac) = raw_mac.as_deref().and_then(normalize_mac) else {
            continue;
        };

        let device_type: Option<String> = row.get(1)?;
        // The blob column is TEXT in current Kismet and BLOB in older logs
        let blob = match row.get_ref(2)? {
            rusqlite::types::ValueRef::Text(t) | rusqlite::types::ValueRef::Blob(t) => Some(t),
            _ => None,
        };
        let ssid = blob.and_then(|b| extract_ssid(&mac, b));

        // A MAC can appear once per phy; keep what we learn from each row
        let entry = devices.entry(mac).or_default();
        if entry.device_type.is_none() {
            entry.device_type = device_type.filter(|t| !t.is_empty());
        }
        if entry.ssid.is_none() {
            entry.ssid = ssid;
        }
    }

    Ok((devices, count))
}

/// Pull the last beaconed SSID out of a device's JSON record.
fn extract_ssid(mac: &str, blob: &[u8]) -> Option<String> {
    let json: JsonValue = match serde_json::from_slice(blob) {
        Ok(v) => v,
        Err(e) => {
            log::debug!("Ignoring malformed device record for {}: {}", mac, e);
            return None;
        }
    };

    json.get("dot11.device")?
        .get("dot11.device.last_beaconed_ssid_record")?
        .get("dot11.advertisedssid.ssid")?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
