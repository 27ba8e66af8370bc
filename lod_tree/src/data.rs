//! Points and the codec that moves attribute values in and out of raw point records.

use std::fmt;

use glam::DVec3;

use crate::attribute::{Attribute, DataAttributes};
use crate::error::{Error, Result};

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    /// Only produced for `uint64`, every narrower unsigned type fits in `Int`.
    UInt(u64),
    Float(f64),
    Bytes(Vec<u8>),
}

impl Value {

    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Int(x) => Ok(*x as f64),
            Value::UInt(x) => Ok(*x as f64),
            Value::Float(x) => Ok(*x),
            Value::Bytes(_) => Err(Error::InvalidOperation("bytes value has no numeric value".to_string())),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Value::Int(x) => Ok(*x),
            Value::UInt(x) => i64::try_from(*x).map_err(|_| Error::InvalidOperation(format!("{} does not fit in i64", x))),
            Value::Float(x) => Ok(*x as i64),
            Value::Bytes(_) => Err(Error::InvalidOperation("bytes value has no numeric value".to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Int(x) => write!(f, "{}", x),
            Value::UInt(x) => write!(f, "{}", x),
            Value::Float(x) => write!(f, "{}", x),
            Value::Bytes(x) => write!(f, "{:02x?}", x),
        }
    }
}

/// One point record. The raw bytes are kept exactly as read so they can be written back out
/// untouched; only the position is decoded up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    data: Vec<u8>,
    position: DVec3,
}

impl Point {

    pub fn new(schema: &DataAttributes, data: Vec<u8>) -> Result<Self> {

        let position = Parser::coordinate(schema, &data)?;

        return Ok(Self {
            data,
            position,
        });
    }

    pub fn from_slice(schema: &DataAttributes, data: &[u8]) -> Result<Self> {
        Self::new(schema, data.to_vec())
    }

    /// Builds a record from one value per attribute, in offset order.
    pub fn from_values(schema: &DataAttributes, values: &[Value]) -> Result<Self> {
        let data = Parser::encode(schema, values)?;
        Self::new(schema, data)
    }

    pub fn position(&self) -> DVec3 {
        self.position
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn get(&self, attribute: &Attribute) -> Result<Value> {
        attribute.get(&self.data)
    }
}

pub struct Parser {}

impl Parser {

    fn check_stride(schema: &DataAttributes, data: &[u8]) -> Result<()> {

        if data.len() != schema.stride() {
            return Err(Error::Decode { expected: schema.stride(), actual: data.len() });
        }

        Ok(())
    }

    /// Every attribute value of a record, in offset order.
    pub fn decode(schema: &DataAttributes, data: &[u8]) -> Result<Vec<Value>> {

        Self::check_stride(schema, data)?;

        let mut values: Vec<Value> = Vec::with_capacity(schema.len());
        for attribute in schema.iter() {
            values.push(attribute.get(data)?);
        }

        Ok(values)
    }

    pub fn coordinate(schema: &DataAttributes, data: &[u8]) -> Result<DVec3> {

        Self::check_stride(schema, data)?;

        let [x, y, z] = schema.xyz()?;

        Ok(DVec3::new(x.get_f64(data)?, y.get_f64(data)?, z.get_f64(data)?))
    }

    /// Inverse of `decode`. Bytes not covered by any attribute are left zeroed.
    pub fn encode(schema: &DataAttributes, values: &[Value]) -> Result<Vec<u8>> {

        if values.len() != schema.len() {
            return Err(Error::InvalidOperation(format!("schema has {} attributes, got {} values", schema.len(), values.len())));
        }

        let mut data = vec![0u8; schema.stride()];
        for (attribute, value) in schema.iter().zip(values.iter()) {
            attribute.put(&mut data, value)?;
        }

        Ok(data)
    }

    /// Overwrites one named attribute of a raw record.
    pub fn put(schema: &DataAttributes, data: &mut [u8], name: &str, value: &Value) -> Result<()> {

        Self::check_stride(schema, data)?;

        match schema.get(name) {
            Some(attribute) => attribute.put(data, value),
            None => Err(Error::Schema(format!("no attribute named `{}`", name))),
        }
    }

    /// Splits a cell payload into its point records.
    pub fn points(schema: &DataAttributes, payload: &[u8]) -> Result<Vec<Point>> {

        let stride = schema.stride();

        if stride == 0 || payload.len() % stride != 0 {
            return Err(Error::Decode { expected: stride, actual: payload.len() });
        }

        payload.chunks_exact(stride).map(|x| Point::from_slice(schema, x)).collect()
    }
}
