// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Stagehand-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Stagehand and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// When an attribute is read or written: the timeless default, or a numeric time code.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimeCode {
    #[default]
    Default,
    At(f64),
}

impl TimeCode {
    /// Accepts `"default"`, a number, or a numeric string.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(Self::Default),
            Value::Number(n) => n.as_f64().filter(|t| t.is_finite()).map(Self::At),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            Self::Default => Value::String("default".to_owned()),
            Self::At(t) => Value::from(t),
        }
    }
}

impl FromStr for TimeCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("default") {
            return Ok(Self::Default);
        }
        s.parse::<f64>().ok().filter(|t| t.is_finite()).map(Self::At).ok_or(())
    }
}

impl Serialize for TimeCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Default => serializer.serialize_str("default"),
            Self::At(t) => serializer.serialize_f64(*t),
        }
    }
}

impl<'de> Deserialize<'de> for TimeCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(&raw)
            .ok_or_else(|| serde::de::Error::custom("time must be \"default\" or a number"))
    }
}

/// Declared up-axis of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Axis {
    Y,
    #[default]
    Z,
}

impl Axis {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }
}

impl FromStr for Axis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Y" | "y" => Ok(Self::Y),
            "Z" | "z" => Ok(Self::Z),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a node is authored: a concrete definition, an override, or an abstract class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specifier {
    #[default]
    Def,
    Over,
    Class,
}

impl Specifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Def => "def",
            Self::Over => "over",
            Self::Class => "class",
        }
    }
}

impl FromStr for Specifier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "def" => Ok(Self::Def),
            "over" => Ok(Self::Over),
            "class" => Ok(Self::Class),
            _ => Err(()),
        }
    }
}
