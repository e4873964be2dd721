use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::register::RegisterType;

#[derive(Clone, Default, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[default]
    Void,
    Bool,
    Int,
    Half,
    Float,
    Array {
        element_type: Box<DataType>,
        // None for dimensions whose size is passed as a hidden int argument
        length: Option<usize>,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    In,
    Out,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncParam {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub direction: Direction,
}

/// Declared type signature of a built-in: return type plus ordered parameters.
///
/// Parameter names are not part of the signature identity; two signatures
/// with the same types and directions in the same order are equal.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Signature {
    pub ret: DataType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<FuncParam>,
}

impl DataType {
    pub fn array(element_type: DataType, length: usize) -> DataType {
        DataType::Array {
            element_type: Box::new(element_type),
            length: Some(length),
        }
    }

    pub fn unsized_array(element_type: DataType) -> DataType {
        DataType::Array {
            element_type: Box::new(element_type),
            length: None,
        }
    }

    pub fn float3() -> DataType {
        DataType::array(DataType::Float, 3)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, DataType::Void)
    }

    /// Number of dimensions whose size travels as a hidden argument.
    pub fn unsized_dims(&self) -> usize {
        match self {
            DataType::Array {
                element_type,
                length,
            } => usize::from(length.is_none()) + element_type.unsized_dims(),
            _ => 0,
        }
    }

    /// The register shape that carries a value of this type, if one exists.
    pub fn register_type(&self) -> Option<RegisterType> {
        match self {
            DataType::Void => None,
            DataType::Bool => Some(RegisterType::Bool),
            DataType::Int => Some(RegisterType::Int),
            DataType::Half => Some(RegisterType::Half),
            DataType::Float => Some(RegisterType::Float),
            DataType::Array {
                element_type,
                length: Some(3),
            } if **element_type == DataType::Float => Some(RegisterType::Vec3),
            DataType::Array {
                element_type,
                length: None,
            } => match element_type.innermost_sized() {
                (DataType::Float, None) => Some(RegisterType::FloatArray),
                (DataType::Float, Some(2)) => Some(RegisterType::Float2Array),
                (DataType::Float, Some(3)) => Some(RegisterType::Vec3Array),
                _ => None,
            },
            DataType::Array { .. } => None,
        }
    }

    // Skips unsized dimensions; returns the scalar type and the innermost
    // fixed length, if any.
    fn innermost_sized(&self) -> (&DataType, Option<usize>) {
        match self {
            DataType::Array {
                element_type,
                length: None,
            } => element_type.innermost_sized(),
            DataType::Array {
                element_type,
                length: Some(length),
            } if !matches!(**element_type, DataType::Array { .. }) => {
                (element_type.as_ref(), Some(*length))
            }
            other => (other, None),
        }
    }

    fn scalar_name(&self) -> &'static str {
        match self {
            DataType::Void => "void",
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Half => "half",
            DataType::Float => "float",
            DataType::Array { element_type, .. } => element_type.scalar_name(),
        }
    }

    fn write_dims(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let DataType::Array {
            element_type,
            length,
        } = self
        {
            match length {
                Some(length) => write!(f, "[{}]", length)?,
                None => write!(f, "[]")?,
            }
            element_type.write_dims(f)?;
        }
        Ok(())
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scalar_name())?;
        self.write_dims(f)
    }
}

impl FuncParam {
    pub fn input(name: &str, data_type: DataType) -> Self {
        FuncParam {
            name: name.to_string(),
            data_type,
            direction: Direction::In,
        }
    }

    pub fn output(name: &str, data_type: DataType) -> Self {
        FuncParam {
            name: name.to_string(),
            data_type,
            direction: Direction::Out,
        }
    }
}

impl Display for FuncParam {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.direction == Direction::Out {
            write!(f, "output ")?;
        }
        write!(f, "{} {}", self.data_type, self.name)
    }
}

impl Signature {
    pub fn new(ret: DataType) -> Self {
        Signature {
            ret,
            params: Vec::new(),
        }
    }

    pub fn input(mut self, name: &str, data_type: DataType) -> Self {
        self.params.push(FuncParam::input(name, data_type));
        self
    }

    pub fn output(mut self, name: &str, data_type: DataType) -> Self {
        self.params.push(FuncParam::output(name, data_type));
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|param| param.name == name)
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.ret == other.ret
            && self.params.len() == other.params.len()
            && self
                .params
                .iter()
                .zip(&other.params)
                .all(|(a, b)| a.data_type == b.data_type && a.direction == b.direction)
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ret.hash(state);
        self.params.len().hash(state);
        for param in &self.params {
            param.data_type.hash(state);
            param.direction.hash(state);
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (", self.ret)?;
        for (idx, param) in self.params.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_3d() -> DataType {
        DataType::unsized_array(DataType::unsized_array(DataType::unsized_array(
            DataType::float3(),
        )))
    }

    #[test]
    fn display_uses_declaration_syntax() {
        assert_eq!(DataType::float3().to_string(), "float[3]");
        assert_eq!(table_3d().to_string(), "float[][][][3]");
        assert_eq!(
            DataType::unsized_array(DataType::array(DataType::Float, 2)).to_string(),
            "float[][2]"
        );

        let sig = Signature::new(DataType::Void)
            .input("p0", DataType::Half)
            .output("q0", DataType::Half);
        assert_eq!(sig.to_string(), "void (half p0, output half q0)");
    }

    #[test]
    fn unsized_dims_counts_hidden_sizes() {
        assert_eq!(DataType::Float.unsized_dims(), 0);
        assert_eq!(DataType::float3().unsized_dims(), 0);
        assert_eq!(DataType::unsized_array(DataType::Float).unsized_dims(), 1);
        assert_eq!(table_3d().unsized_dims(), 3);
    }

    #[test]
    fn register_types() {
        assert_eq!(DataType::Void.register_type(), None);
        assert_eq!(DataType::Half.register_type(), Some(RegisterType::Half));
        assert_eq!(DataType::float3().register_type(), Some(RegisterType::Vec3));
        assert_eq!(
            DataType::unsized_array(DataType::Float).register_type(),
            Some(RegisterType::FloatArray)
        );
        assert_eq!(
            DataType::unsized_array(DataType::array(DataType::Float, 2)).register_type(),
            Some(RegisterType::Float2Array)
        );
        assert_eq!(table_3d().register_type(), Some(RegisterType::Vec3Array));
        assert_eq!(DataType::array(DataType::Int, 4).register_type(), None);
    }

    #[test]
    fn param_names_do_not_affect_identity() {
        let a = Signature::new(DataType::Float).input("p", DataType::Float);
        let b = Signature::new(DataType::Float).input("x", DataType::Float);
        let c = Signature::new(DataType::Float).output("p", DataType::Float);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut set = hashbrown::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
        assert!(!set.contains(&c));
    }

    #[test]
    fn yaml_roundtrip() -> anyhow::Result<()> {
        let sig = Signature::new(DataType::Float)
            .input("table", DataType::unsized_array(DataType::Float))
            .input("p", DataType::Float);

        let yaml = serde_yml::to_string(&sig)?;
        let parsed: Signature = serde_yml::from_str(&yaml)?;

        assert_eq!(parsed, sig);
        assert_eq!(parsed.params[0].name, "table");

        Ok(())
    }
}
