//! Attribute schema of a point record.
//!
//! Every dataset ships an `attributes.csv` with one row per field of its fixed-length point
//! record. The rows are parsed into [`Attribute`]s and collected into a [`DataAttributes`]
//! schema, which knows the record stride and how to find a field by name.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use crate::data::Value;
use crate::error::{Error, Result};
use crate::layout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Opaque bytes, copied as a block. Has no numeric value.
    Bytes,
}

impl AttributeType {

    pub const ALL: [AttributeType; 11] = [
        AttributeType::Int8,
        AttributeType::UInt8,
        AttributeType::Int16,
        AttributeType::UInt16,
        AttributeType::Int32,
        AttributeType::UInt32,
        AttributeType::Int64,
        AttributeType::UInt64,
        AttributeType::Float32,
        AttributeType::Float64,
        AttributeType::Bytes,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::Int8 => "int8",
            AttributeType::UInt8 => "uint8",
            AttributeType::Int16 => "int16",
            AttributeType::UInt16 => "uint16",
            AttributeType::Int32 => "int32",
            AttributeType::UInt32 => "uint32",
            AttributeType::Int64 => "int64",
            AttributeType::UInt64 => "uint64",
            AttributeType::Float32 => "float32",
            AttributeType::Float64 => "float64",
            AttributeType::Bytes => "bytes",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {

        for t in Self::ALL.iter() {
            if t.name() == name {
                return Ok(*t);
            }
        }

        return Err(Error::Schema(format!("unknown attribute type `{}`", name)));
    }

    /// Width in bytes of one value, `None` for raw bytes.
    pub fn width(&self) -> Option<usize> {
        match self {
            AttributeType::Int8 | AttributeType::UInt8 => Some(1),
            AttributeType::Int16 | AttributeType::UInt16 => Some(2),
            AttributeType::Int32 | AttributeType::UInt32 | AttributeType::Float32 => Some(4),
            AttributeType::Int64 | AttributeType::UInt64 | AttributeType::Float64 => Some(8),
            AttributeType::Bytes => None,
        }
    }

    fn numeric_width(&self) -> Result<usize> {
        match self.width() {
            Some(w) => Ok(w),
            None => Err(Error::InvalidOperation(format!("`{}` attribute has no numeric value", self.name()))),
        }
    }

    fn check_bounds(len: usize, offset: usize, width: usize) -> Result<()> {

        match offset.checked_add(width) {
            Some(end) if end <= len => {},
            Some(end) => return Err(Error::Decode { expected: end, actual: len }),
            None => return Err(Error::Decode { expected: usize::MAX, actual: len }),
        }

        Ok(())
    }

    /// Reads the value stored at `offset` of a record. Unsigned values narrower than 64 bits are
    /// widened into `Value::Int` so they never come back negative.
    pub fn read(&self, data: &[u8], offset: usize) -> Result<Value> {

        let width = self.numeric_width()?;
        Self::check_bounds(data.len(), offset, width)?;

        let slice = &data[offset..offset + width];

        let value = match self {
            AttributeType::Int8 => Value::Int(slice[0] as i8 as i64),
            AttributeType::UInt8 => Value::Int(slice[0] as i64),
            AttributeType::Int16 => Value::Int(LittleEndian::read_i16(slice) as i64),
            AttributeType::UInt16 => Value::Int(LittleEndian::read_u16(slice) as i64),
            AttributeType::Int32 => Value::Int(LittleEndian::read_i32(slice) as i64),
            AttributeType::UInt32 => Value::Int(LittleEndian::read_u32(slice) as i64),
            AttributeType::Int64 => Value::Int(LittleEndian::read_i64(slice)),
            AttributeType::UInt64 => Value::UInt(LittleEndian::read_u64(slice)),
            AttributeType::Float32 => Value::Float(LittleEndian::read_f32(slice) as f64),
            AttributeType::Float64 => Value::Float(LittleEndian::read_f64(slice)),
            AttributeType::Bytes => unreachable!(),
        };

        Ok(value)
    }

    /// Writes a numeric value at `offset`. Integer targets reject floats and out of range values.
    pub fn write(&self, data: &mut [u8], offset: usize, value: &Value) -> Result<()> {

        let width = self.numeric_width()?;
        Self::check_bounds(data.len(), offset, width)?;

        let slice = &mut data[offset..offset + width];

        match self {
            AttributeType::Float32 => LittleEndian::write_f32(slice, value.as_f64()? as f32),
            AttributeType::Float64 => LittleEndian::write_f64(slice, value.as_f64()?),
            _ => {
                let wide: i128 = match value {
                    Value::Int(x) => *x as i128,
                    Value::UInt(x) => *x as i128,
                    _ => {
                        return Err(Error::InvalidOperation(format!("cannot store {:?} in `{}` attribute", value, self.name())));
                    }
                };

                let out_of_range = || Error::InvalidOperation(format!("{} does not fit in `{}` attribute", wide, self.name()));

                match self {
                    AttributeType::Int8 => slice[0] = i8::try_from(wide).map_err(|_| out_of_range())? as u8,
                    AttributeType::UInt8 => slice[0] = u8::try_from(wide).map_err(|_| out_of_range())?,
                    AttributeType::Int16 => LittleEndian::write_i16(slice, i16::try_from(wide).map_err(|_| out_of_range())?),
                    AttributeType::UInt16 => LittleEndian::write_u16(slice, u16::try_from(wide).map_err(|_| out_of_range())?),
                    AttributeType::Int32 => LittleEndian::write_i32(slice, i32::try_from(wide).map_err(|_| out_of_range())?),
                    AttributeType::UInt32 => LittleEndian::write_u32(slice, u32::try_from(wide).map_err(|_| out_of_range())?),
                    AttributeType::Int64 => LittleEndian::write_i64(slice, i64::try_from(wide).map_err(|_| out_of_range())?),
                    AttributeType::UInt64 => LittleEndian::write_u64(slice, u64::try_from(wide).map_err(|_| out_of_range())?),
                    _ => unreachable!(),
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One field of a point record, exactly as described by a row of `attributes.csv`.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub index: usize,
    pub name: String,
    pub offset: usize,
    pub size: usize,
    pub attribute_type: AttributeType,
    pub type_bytes: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub variance: f64,
}

impl Attribute {

    /// Numeric attribute with its size taken from the type and empty statistics.
    pub fn new(index: usize, name: &str, offset: usize, attribute_type: AttributeType) -> Self {

        let size = attribute_type.width().unwrap_or(0);

        return Self {
            index,
            name: name.to_string(),
            offset,
            size,
            attribute_type,
            type_bytes: size,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            variance: 0.0,
        }
    }

    pub fn bytes(index: usize, name: &str, offset: usize, size: usize) -> Self {

        let mut attribute = Self::new(index, name, offset, AttributeType::Bytes);
        attribute.size = size;
        attribute.type_bytes = 1;

        return attribute;
    }

    pub fn end(&self) -> usize {
        self.offset.saturating_add(self.size)
    }

    fn check_end(&self) -> Result<()> {

        match self.offset.checked_add(self.size) {
            Some(_) => Ok(()),
            None => Err(Error::Schema(format!("attribute `{}` ends past the addressable range (offset {}, size {})", self.name, self.offset, self.size))),
        }
    }

    pub fn from_line(line: &str) -> Result<Self> {

        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').map(|x| x.trim()).collect();

        if fields.len() != layout::ATTRIBUTES_COLUMNS {
            return Err(Error::Schema(format!("expected {} columns, found {}: `{}`", layout::ATTRIBUTES_COLUMNS, fields.len(), line)));
        }

        fn int(field: &str, column: &str) -> Result<usize> {
            field.parse::<usize>().map_err(|_| Error::Schema(format!("bad {} `{}`", column, field)))
        }

        fn float(field: &str, column: &str) -> Result<f64> {
            field.parse::<f64>().map_err(|_| Error::Schema(format!("bad {} `{}`", column, field)))
        }

        if fields[1].is_empty() {
            return Err(Error::Schema(format!("attribute without a name: `{}`", line)));
        }

        let attribute = Self {
            index: int(fields[0], "index")?,
            name: fields[1].to_string(),
            offset: int(fields[2], "offset")?,
            size: int(fields[3], "size")?,
            attribute_type: AttributeType::from_name(fields[4])?,
            type_bytes: int(fields[5], "typeBytes")?,
            min: float(fields[6], "min")?,
            max: float(fields[7], "max")?,
            mean: float(fields[8], "mean")?,
            variance: float(fields[9], "variance")?,
        };

        if let Some(width) = attribute.attribute_type.width() {
            if attribute.size < width {
                return Err(Error::Schema(format!("attribute `{}` has size {} but {} needs {}", attribute.name, attribute.size, attribute.attribute_type, width)));
            }
        }

        attribute.check_end()?;

        return Ok(attribute);
    }

    pub fn to_line(&self) -> String {

        format!("{},{},{},{},{},{},{},{},{},{}",
            self.index,
            self.name,
            self.offset,
            self.size,
            self.attribute_type,
            self.type_bytes,
            self.min,
            self.max,
            self.mean,
            self.variance)
    }

    pub fn get(&self, data: &[u8]) -> Result<Value> {

        match self.attribute_type {
            AttributeType::Bytes => Ok(Value::Bytes(self.get_bytes(data)?.to_vec())),
            t => t.read(data, self.offset),
        }
    }

    pub fn get_f64(&self, data: &[u8]) -> Result<f64> {
        self.attribute_type.read(data, self.offset)?.as_f64()
    }

    pub fn get_i64(&self, data: &[u8]) -> Result<i64> {
        self.attribute_type.read(data, self.offset)?.as_i64()
    }

    pub fn get_bytes<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {

        if self.end() > data.len() {
            return Err(Error::Decode { expected: self.end(), actual: data.len() });
        }

        Ok(&data[self.offset..self.end()])
    }

    pub fn put(&self, data: &mut [u8], value: &Value) -> Result<()> {

        match (self.attribute_type, value) {
            (AttributeType::Bytes, Value::Bytes(bytes)) => {

                if bytes.len() != self.size {
                    return Err(Error::InvalidOperation(format!("`{}` holds {} bytes, got {}", self.name, self.size, bytes.len())));
                }
                if self.end() > data.len() {
                    return Err(Error::Decode { expected: self.end(), actual: data.len() });
                }

                data[self.offset..self.end()].copy_from_slice(bytes);
                Ok(())
            },
            (AttributeType::Bytes, _) => {
                Err(Error::InvalidOperation(format!("`{}` is a bytes attribute, cannot store {:?}", self.name, value)))
            },
            (t, _) => t.write(data, self.offset, value),
        }
    }
}

/// The schema of a dataset: its attributes sorted by offset.
#[derive(Debug, Clone, PartialEq)]
pub struct DataAttributes {
    attributes: Vec<Attribute>,
    by_name: HashMap<String, usize>,
    stride: usize,
}

impl DataAttributes {

    /// Builds the schema. Attributes may come in any order but must not overlap and must have
    /// unique names.
    pub fn new(mut attributes: Vec<Attribute>) -> Result<Self> {

        for attribute in attributes.iter() {
            attribute.check_end()?;
        }

        attributes.sort_by(|a, b| a.offset.cmp(&b.offset).then(a.end().cmp(&b.end())));

        for pair in attributes.windows(2) {
            if pair[0].end() > pair[1].offset {
                return Err(Error::Schema(format!("attributes `{}` and `{}` overlap", pair[0].name, pair[1].name)));
            }
        }

        let mut by_name: HashMap<String, usize> = HashMap::with_capacity(attributes.len());
        for (i, attribute) in attributes.iter().enumerate() {
            if by_name.insert(attribute.name.clone(), i).is_some() {
                return Err(Error::Schema(format!("attribute `{}` appears twice", attribute.name)));
            }
        }

        let stride = match attributes.last() {
            Some(x) => x.end(),
            None => 0,
        };

        return Ok(Self {
            attributes,
            by_name,
            stride,
        });
    }

    /// Fixed length of one point record.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.by_name.get(name).map(|i| &self.attributes[*i])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.attributes.iter()
    }

    /// Comma joined attribute names in offset order, for CSV headers.
    pub fn names(&self) -> String {
        self.attributes.iter().map(|x| x.name.as_str()).collect::<Vec<_>>().join(",")
    }

    /// The X, Y and Z attributes, required by every spatial tree.
    pub fn xyz(&self) -> Result<[&Attribute; 3]> {

        let find = |name: &str| self.get(name).ok_or_else(|| Error::MissingCoordinate(name.to_string()));

        Ok([
            find(layout::X_ATTRIBUTE)?,
            find(layout::Y_ATTRIBUTE)?,
            find(layout::Z_ATTRIBUTE)?,
        ])
    }

    pub fn from_csv(contents: &str) -> Result<Self> {

        let mut lines = contents.lines();

        match lines.next() {
            Some(header) if header.trim() == layout::ATTRIBUTES_HEADER => {},
            Some(header) => return Err(Error::Schema(format!("unexpected header `{}`", header))),
            None => return Err(Error::Schema("empty attribute file".to_string())),
        }

        let mut attributes: Vec<Attribute> = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            attributes.push(Attribute::from_line(line)?);
        }

        return Self::new(attributes);
    }

    pub fn to_csv(&self) -> String {

        let mut s = layout::ATTRIBUTES_HEADER.to_string();
        s += "\n";
        for attribute in self.attributes.iter() {
            s += &attribute.to_line();
            s += "\n";
        }

        return s;
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_csv(&contents)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_csv())?;
        Ok(())
    }
}
