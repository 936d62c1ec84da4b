// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Load-based admission control (C7): before a search, retrieval, or
//! information operation runs, check the one-minute load average against a
//! per-class maximum and reject if it's exceeded. A failed load-average
//! read is treated as "not exceeded", per §4.7.

use std::fmt;

use mps_spi::SpiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionClass {
    Connection,
    Search,
    Retrieval,
    Information,
}

impl AdmissionClass {
    fn label(self) -> &'static str {
        match self {
            AdmissionClass::Connection => "connection",
            AdmissionClass::Search => "search",
            AdmissionClass::Retrieval => "retrieval",
            AdmissionClass::Information => "information",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AdmissionError {
    pub class: AdmissionClass,
    pub load: f64,
    pub max: f64,
}

impl fmt::Display for AdmissionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "one-minute load is too high for {} operations: {:.2} exceeds configured maximum {:.2}",
            self.class.label(),
            self.load,
            self.max
        )
    }
}

impl AdmissionError {
    /// The stable numeric code this maps to on the wire, shared between the
    /// LWPS error frame and the HTTP RSS error body.
    pub fn spi_error(&self) -> SpiError {
        SpiError::ExceededLoadMaximum
    }
}

/// Per-class load maxima, each independently toggled off by a
/// non-positive value. Mirrors `--max-load`/`--max-connection-load`/
/// `--max-search-load`/`--max-retrieval-load`/`--max-information-load`.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionLimits {
    pub connection: f64,
    pub search: f64,
    pub retrieval: f64,
    pub information: f64,
}

impl AdmissionLimits {
    /// All four classes default to the global `--max-load` value (5.0).
    pub fn uniform(max_load: f64) -> AdmissionLimits {
        AdmissionLimits {
            connection: max_load,
            search: max_load,
            retrieval: max_load,
            information: max_load,
        }
    }

    fn max_for(&self, class: AdmissionClass) -> f64 {
        match class {
            AdmissionClass::Connection => self.connection,
            AdmissionClass::Search => self.search,
            AdmissionClass::Retrieval => self.retrieval,
            AdmissionClass::Information => self.information,
        }
    }
}

pub struct AdmissionController {
    limits: AdmissionLimits,
}

impl AdmissionController {
    pub fn new(limits: AdmissionLimits) -> AdmissionController {
        AdmissionController { limits }
    }

    /// Returns `Err` only when the class's maximum is positive (enabled)
    /// and the current one-minute load average exceeds it.
    pub fn check(&self, class: AdmissionClass) -> Result<(), AdmissionError> {
        let max = self.limits.max_for(class);
        if max <= 0.0 {
            return Ok(());
        }
        let Some(load) = one_minute_load_average() else {
            return Ok(());
        };
        if load > max {
            return Err(AdmissionError { class, load, max });
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn one_minute_load_average() -> Option<f64> {
    // `/proc/loadavg` avoids the libc getloadavg() wrapper's reliance on
    // sysinfo(), which some hardened containers restrict.
    let contents = std::fs::read_to_string("/proc/loadavg").ok()?;
    contents.split_whitespace().next()?.parse::<f64>().ok()
}

#[cfg(not(target_os = "linux"))]
fn one_minute_load_average() -> Option<f64> {
    let mut averages = [0f64; 3];
    let n = unsafe { libc::getloadavg(averages.as_mut_ptr(), averages.len() as libc::c_int) };
    if n <= 0 {
        None
    } else {
        Some(averages[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_class_never_rejects() {
        let controller = AdmissionController::new(AdmissionLimits {
            connection: 0.0,
            search: 0.0,
            retrieval: 0.0,
            information: 0.0,
        });
        assert!(controller.check(AdmissionClass::Search).is_ok());
    }

    #[test]
    fn huge_max_never_rejects_on_this_host() {
        let controller = AdmissionController::new(AdmissionLimits::uniform(1_000_000.0));
        assert!(controller.check(AdmissionClass::Search).is_ok());
    }
}
