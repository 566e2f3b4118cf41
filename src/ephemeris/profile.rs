use serde::{Deserialize, Serialize};

/// What kind of assistance data a device wants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// data types: eph, alm, aux, pos
    pub datatype: Vec<String>,
    /// `mga` for UBX-MGA-* (M8 onwards), `aid` for UBX-AID-* (u7 or earlier)
    pub format: String,
    /// constellations: gps, qzss, glo
    pub gnss: Vec<String>,
    /// only satellites likely visible from the supplied position
    pub filter_on_pos: bool,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            datatype: vec!["pos".into(), "eph".into(), "aux".into()],
            format: "aid".into(),
            gnss: vec!["gps".into()],
            filter_on_pos: true,
        }
    }
}

impl Profile {
    /// Canonical form identifying the profile in the cache store.
    pub fn key(&self) -> String {
        let mut key = self.params().join(";");
        if self.filter_on_pos {
            if !key.is_empty() {
                key.push(';');
            }
            key.push_str("filteronpos");
        }
        key
    }

    /// Request parameters that do not depend on the position.
    pub(crate) fn params(&self) -> Vec<String> {
        let mut params = Vec::new();
        if !self.format.is_empty() {
            params.push(format!("format={}", self.format));
        }
        if !self.datatype.is_empty() {
            params.push(format!("datatype={}", self.datatype.join(",")));
        }
        if !self.gnss.is_empty() {
            params.push(format!("gnss={}", self.gnss.join(",")));
        }
        params
    }
}
