//! The function registry capability and the builtin function table.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Range(usize, usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exact(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::AtLeast(min) => count >= min,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(1) => write!(f, "1 argument"),
            Arity::Exact(n) => write!(f, "{} arguments", n),
            Arity::Range(min, max) => write!(f, "{} to {} arguments", min, max),
            Arity::AtLeast(n) => write!(f, "at least {} arguments", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: String,
    pub parameters: Vec<String>,
    pub arity: Arity,
    pub documentation: String,
}

impl FunctionSignature {
    pub fn new(name: &str, parameters: &[&str], arity: Arity, documentation: &str) -> Self {
        Self {
            name: name.to_string(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            arity,
            documentation: documentation.to_string(),
        }
    }

    pub fn label(&self) -> String {
        format!("{}({})", self.name, self.parameters.join(", "))
    }
}

/// Functions callable from expressions, supplied to the analyzer at construction.
pub trait FunctionRegistry: Send + Sync {
    fn list(&self) -> Vec<FunctionSignature>;

    fn get(&self, name: &str) -> Option<FunctionSignature> {
        self.list().into_iter().find(|f| f.name == name)
    }
}

lazy_static! {
    pub static ref BUILTIN_FUNCTIONS: Vec<FunctionSignature> = {
        use Arity::*;
        vec![
            FunctionSignature::new("add", &["a", "b"], AtLeast(2), "Returns the sum of the arguments."),
            FunctionSignature::new("sub", &["a", "b"], AtLeast(2), "Subtracts each following argument from the first."),
            FunctionSignature::new("mul", &["a", "b"], AtLeast(2), "Returns the product of the arguments."),
            FunctionSignature::new("div", &["a", "b"], AtLeast(2), "Divides the first argument by each following one."),
            FunctionSignature::new("max", &["a", "b"], AtLeast(1), "Returns the largest value."),
            FunctionSignature::new("min", &["a", "b"], AtLeast(1), "Returns the smallest value."),
            FunctionSignature::new("round", &["number", "precision"], Range(1, 2), "Rounds a number to the given precision."),
            FunctionSignature::new("rand", &["min", "max"], Exact(2), "Returns a random integer in `[min, max)`."),
            FunctionSignature::new("concat", &["value1", "value2"], AtLeast(1), "Concatenates strings or lists."),
            FunctionSignature::new("length", &["text"], Exact(1), "Returns the length of a string."),
            FunctionSignature::new("replace", &["text", "old", "new"], Exact(3), "Replaces every occurrence of a substring."),
            FunctionSignature::new("toLower", &["text"], Range(1, 2), "Converts a string to lower case."),
            FunctionSignature::new("toUpper", &["text"], Range(1, 2), "Converts a string to upper case."),
            FunctionSignature::new("trim", &["text"], Exact(1), "Removes leading and trailing whitespace."),
            FunctionSignature::new("split", &["text", "separator"], Range(1, 2), "Splits a string into a list."),
            FunctionSignature::new("substring", &["text", "start", "length"], Range(2, 3), "Returns part of a string."),
            FunctionSignature::new("indexOf", &["collection", "value"], Exact(2), "Returns the index of the first occurrence of a value."),
            FunctionSignature::new("join", &["list", "separator", "lastSeparator"], Range(2, 3), "Joins list items into a string."),
            FunctionSignature::new("count", &["collection"], Exact(1), "Returns the number of items in a collection."),
            FunctionSignature::new("contains", &["collection", "value"], Exact(2), "Checks whether a collection holds a value."),
            FunctionSignature::new("first", &["collection"], Exact(1), "Returns the first item of a collection."),
            FunctionSignature::new("last", &["collection"], Exact(1), "Returns the last item of a collection."),
            FunctionSignature::new("take", &["collection", "count"], Exact(2), "Returns the first items of a collection."),
            FunctionSignature::new("skip", &["collection", "count"], Exact(2), "Drops the first items of a collection."),
            FunctionSignature::new("createArray", &["value1", "value2"], AtLeast(0), "Builds a list from the arguments."),
            FunctionSignature::new("foreach", &["collection", "item", "expression"], Exact(3), "Maps every item of a collection."),
            FunctionSignature::new("where", &["collection", "item", "condition"], Exact(3), "Filters a collection."),
            FunctionSignature::new("if", &["condition", "whenTrue", "whenFalse"], Exact(3), "Returns one of two values depending on a condition."),
            FunctionSignature::new("not", &["value"], Exact(1), "Negates a boolean."),
            FunctionSignature::new("and", &["a", "b"], AtLeast(1), "True when every argument is true."),
            FunctionSignature::new("or", &["a", "b"], AtLeast(1), "True when any argument is true."),
            FunctionSignature::new("equals", &["a", "b"], Exact(2), "Checks two values for equality."),
            FunctionSignature::new("exists", &["value"], Exact(1), "True when the value is not null."),
            FunctionSignature::new("empty", &["value"], Exact(1), "True when the value is null, empty or has no items."),
            FunctionSignature::new("coalesce", &["value1", "value2"], AtLeast(1), "Returns the first non-null argument."),
            FunctionSignature::new("isMatch", &["text", "pattern"], Exact(2), "Tests a string against a regular expression."),
            FunctionSignature::new("string", &["value"], Range(1, 2), "Converts a value to a string."),
            FunctionSignature::new("int", &["value"], Exact(1), "Converts a value to an integer."),
            FunctionSignature::new("float", &["value"], Exact(1), "Converts a value to a floating point number."),
            FunctionSignature::new("bool", &["value"], Exact(1), "Converts a value to a boolean."),
            FunctionSignature::new("json", &["value"], Exact(1), "Parses a JSON string."),
            FunctionSignature::new("utcNow", &["format"], Range(0, 2), "Returns the current timestamp."),
            FunctionSignature::new("formatDateTime", &["timestamp", "format"], Range(1, 3), "Formats a timestamp."),
            FunctionSignature::new("template", &["name", "args"], AtLeast(1), "Evaluates a template by name."),
            FunctionSignature::new("expandText", &["text"], Exact(1), "Evaluates plain text containing expressions."),
        ]
    };
}

/// The registry used when no other is supplied.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFunctions;

impl FunctionRegistry for BuiltinFunctions {
    fn list(&self) -> Vec<FunctionSignature> {
        BUILTIN_FUNCTIONS.clone()
    }

    fn get(&self, name: &str) -> Option<FunctionSignature> {
        BUILTIN_FUNCTIONS.iter().find(|f| f.name == name).cloned()
    }
}
