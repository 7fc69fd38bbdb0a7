//! Resource definitions and the cluster-wide static catalogue.

use serde::{Deserialize, Serialize};

use crate::xdr::{MarshalError, MarshalResult, XdrDecode, XdrDecoder, XdrEncode, XdrEncoder};

/// Resource flag bits (`ResItem::flags`).
pub mod res_flags {
    pub const BUILTIN: i32 = 0x01;
    pub const DYNAMIC: i32 = 0x02;
    pub const GLOBAL: i32 = 0x04;
    pub const SHARED: i32 = 0x08;
    pub const EXTERNAL: i32 = 0x10;
    pub const RELEASE: i32 = 0x20;
}

/// Kind of value a resource carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "LS_BOOLEAN")]
    Boolean,
    #[serde(rename = "LS_NUMERIC")]
    Numeric,
    #[serde(rename = "LS_STRING")]
    String,
    #[serde(rename = "LS_EXTERNAL")]
    External,
}

impl ValueType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ValueType::Boolean),
            1 => Some(ValueType::Numeric),
            2 => Some(ValueType::String),
            3 => Some(ValueType::External),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            ValueType::Boolean => 0,
            ValueType::Numeric => 1,
            ValueType::String => 2,
            ValueType::External => 3,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            ValueType::Boolean => "LS_BOOLEAN",
            ValueType::Numeric => "LS_NUMERIC",
            ValueType::String => "LS_STRING",
            ValueType::External => "LS_EXTERNAL",
        }
    }
}

/// Ordering of a numeric resource: whether bigger values are better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "INCR")]
    Increasing,
    #[serde(rename = "DECR")]
    Decreasing,
    #[serde(rename = "NA")]
    NotApplicable,
}

impl OrderType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(OrderType::Increasing),
            1 => Some(OrderType::Decreasing),
            2 => Some(OrderType::NotApplicable),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            OrderType::Increasing => 0,
            OrderType::Decreasing => 1,
            OrderType::NotApplicable => 2,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            OrderType::Increasing => "INCR",
            OrderType::Decreasing => "DECR",
            OrderType::NotApplicable => "NA",
        }
    }
}

/// A resource definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResItem {
    pub name: String,
    pub description: String,
    pub value_type: ValueType,
    pub order_type: OrderType,
    /// Raw `res_flags` bitmask.
    pub flags: i32,
    /// Update interval in seconds.
    pub interval: i32,
}

impl ResItem {
    pub fn new(name: impl Into<String>, value_type: ValueType, order_type: OrderType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            value_type,
            order_type,
            flags: 0,
            interval: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_flags(mut self, flags: i32) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_interval(mut self, interval: i32) -> Self {
        self.interval = interval;
        self
    }

    pub fn is_builtin(&self) -> bool {
        self.flags & res_flags::BUILTIN != 0
    }
}

impl XdrEncode for ResItem {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_str(&self.name);
        enc.put_str(&self.description);
        enc.put_i32(self.value_type.code());
        enc.put_i32(self.order_type.code());
        enc.put_i32(self.flags);
        enc.put_i32(self.interval);
    }
}

impl XdrDecode for ResItem {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let name = dec.name("resItem.name")?;
        let description = dec.string("resItem.des")?;
        let value_type = dec.i32("resItem.valueType")?;
        let value_type = ValueType::from_code(value_type).ok_or(MarshalError::UnknownSymbol {
            field: "resItem.valueType",
            value: value_type,
        })?;
        let order_type = dec.i32("resItem.orderType")?;
        let order_type = OrderType::from_code(order_type).ok_or(MarshalError::UnknownSymbol {
            field: "resItem.orderType",
            value: order_type,
        })?;
        Ok(Self {
            name,
            description,
            value_type,
            order_type,
            flags: dec.i32_min("resItem.flags", 0)?,
            interval: dec.i32_min("resItem.interval", 0)?,
        })
    }
}

/// Cluster-wide static catalogue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LsInfo {
    pub res_table: Vec<ResItem>,
    pub host_types: Vec<String>,
    pub host_models: Vec<String>,
    /// Architecture name for each model, parallel to `host_models`.
    pub host_archs: Vec<String>,
    /// Reference index for each model, parallel to `host_models`.
    pub model_refs: Vec<i32>,
    /// CPU factor for each model, parallel to `host_models`.
    pub cpu_factor: Vec<f32>,
    /// Number of load indices (built-in plus external).
    pub num_indx: i32,
    /// Number of user-visible load indices.
    pub num_usr_indx: i32,
}

impl LsInfo {
    pub fn n_res(&self) -> usize {
        self.res_table.len()
    }

    pub fn n_types(&self) -> usize {
        self.host_types.len()
    }

    pub fn n_models(&self) -> usize {
        self.host_models.len()
    }

    /// Look up a resource by name.
    pub fn resource(&self, name: &str) -> Option<&ResItem> {
        self.res_table.iter().find(|r| r.name == name)
    }

    /// CPU factor for a model name.
    pub fn model_factor(&self, model: &str) -> Option<f32> {
        let idx = self.host_models.iter().position(|m| m == model)?;
        self.cpu_factor.get(idx).copied()
    }
}

impl XdrEncode for LsInfo {
    fn encode(&self, enc: &mut XdrEncoder) {
        enc.put_i32(self.num_indx);
        enc.put_i32(self.num_usr_indx);
        enc.put_count(self.res_table.len());
        enc.put_count(self.host_types.len());
        enc.put_count(self.host_models.len());
        enc.put_records(&self.res_table);
        enc.put_strs(&self.host_types);
        enc.put_strs(&self.host_models);
        enc.put_strs(&self.host_archs);
        enc.put_array(&self.model_refs, |enc, r| enc.put_i32(*r));
        enc.put_array(&self.cpu_factor, |enc, f| enc.put_f32(*f));
    }
}

impl XdrDecode for LsInfo {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self> {
        let num_indx = dec.i32_min("lsInfo.numIndx", 0)?;
        let num_usr_indx = dec.i32_min("lsInfo.numUsrIndx", 0)?;
        let n_res = dec.count("lsInfo.nRes")?;
        let n_types = dec.count("lsInfo.nTypes")?;
        let n_models = dec.count("lsInfo.nModels")?;
        Ok(Self {
            res_table: dec.records("lsInfo.resTable", n_res)?,
            host_types: dec.names("lsInfo.hostTypes", n_types)?,
            host_models: dec.names("lsInfo.hostModels", n_models)?,
            host_archs: dec.names("lsInfo.hostArchs", n_models)?,
            model_refs: dec.array("lsInfo.modelRefs", n_models, |d| {
                d.i32_min("lsInfo.modelRefs", 0)
            })?,
            cpu_factor: dec.array("lsInfo.cpuFactor", n_models, |d| {
                d.factor("lsInfo.cpuFactor")
            })?,
            num_indx,
            num_usr_indx,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::{from_bytes, to_bytes};

    fn sample() -> LsInfo {
        LsInfo {
            res_table: vec![
                ResItem::new("r15s", ValueType::Numeric, OrderType::Increasing)
                    .with_description("15-second CPU run queue length")
                    .with_flags(res_flags::BUILTIN | res_flags::DYNAMIC)
                    .with_interval(15),
                ResItem::new("linux", ValueType::Boolean, OrderType::NotApplicable),
            ],
            host_types: vec!["linux".into()],
            host_models: vec!["x86_64".into(), "aarch64".into()],
            host_archs: vec!["x86_64".into(), "aarch64".into()],
            model_refs: vec![0, 1],
            cpu_factor: vec![1.0, 0.8],
            num_indx: 11,
            num_usr_indx: 11,
        }
    }

    #[test]
    fn test_lsinfo_decode() {
        let info: LsInfo = from_bytes(&to_bytes(&sample())).unwrap();
        assert_eq!(info.n_res(), 2);
        assert_eq!(info.n_models(), 2);
        assert!(info.resource("r15s").unwrap().is_builtin());
        assert_eq!(info.model_factor("aarch64"), Some(0.8));
    }

    #[test]
    fn test_unknown_value_type_rejected() {
        let mut enc = XdrEncoder::new();
        enc.put_str("mem");
        enc.put_str("");
        enc.put_i32(7);
        enc.put_i32(0);
        enc.put_i32(0);
        enc.put_i32(0);
        let err = from_bytes::<ResItem>(&enc.into_bytes()).unwrap_err();
        assert_eq!(
            err,
            MarshalError::UnknownSymbol {
                field: "resItem.valueType",
                value: 7
            }
        );
    }

    #[test]
    fn test_model_arrays_follow_model_count() {
        let mut info = sample();
        info.host_archs.pop();
        let err = from_bytes::<LsInfo>(&to_bytes(&info)).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::CountMismatch {
                field: "lsInfo.hostArchs",
                declared: 2,
                encoded: 1
            }
        ));
    }

    #[test]
    fn test_symbols() {
        assert_eq!(ValueType::External.symbol(), "LS_EXTERNAL");
        assert_eq!(OrderType::Decreasing.symbol(), "DECR");
        for code in 0..4 {
            assert_eq!(ValueType::from_code(code).unwrap().code(), code);
        }
        assert!(OrderType::from_code(3).is_none());
    }
}
