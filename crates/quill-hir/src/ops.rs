//! The fixed operator-type tables.
//!
//! Binding a unary or binary operator is a lookup against these tables; a
//! combination with no entry is an "operator not defined for type(s)"
//! diagnostic in the binder.

use quill_ast::{BinaryOperator, UnaryOperator};

use crate::types::Type;

// ---------------------------------------------------------------------------
// Unary operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundUnaryOperatorKind {
    Identity,
    Negation,
    LogicalNegation,
    OnesComplement,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

impl BoundUnaryOperatorKind {
    /// True for the operators that mutate their variable operand. Constant
    /// folding never applies to these.
    pub fn is_increment_or_decrement(self) -> bool {
        matches!(
            self,
            BoundUnaryOperatorKind::PreIncrement
                | BoundUnaryOperatorKind::PreDecrement
                | BoundUnaryOperatorKind::PostIncrement
                | BoundUnaryOperatorKind::PostDecrement
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundUnaryOperator {
    pub syntax: UnaryOperator,
    pub kind: BoundUnaryOperatorKind,
    pub operand_type: Type,
    pub result_type: Type,
}

impl BoundUnaryOperator {
    const fn new(
        syntax: UnaryOperator,
        kind: BoundUnaryOperatorKind,
        operand_type: Type,
        result_type: Type,
    ) -> Self {
        Self {
            syntax,
            kind,
            operand_type,
            result_type,
        }
    }

    pub fn bind(syntax: UnaryOperator, operand: Type) -> Option<&'static BoundUnaryOperator> {
        UNARY_OPERATORS
            .iter()
            .find(|op| op.syntax == syntax && op.operand_type == operand)
    }
}

static UNARY_OPERATORS: [BoundUnaryOperator; 14] = {
    use BoundUnaryOperatorKind::*;
    use UnaryOperator as U;
    [
        BoundUnaryOperator::new(U::Identity, Identity, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::Identity, Identity, Type::Float, Type::Float),
        BoundUnaryOperator::new(U::Negation, Negation, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::Negation, Negation, Type::Float, Type::Float),
        BoundUnaryOperator::new(U::LogicalNot, LogicalNegation, Type::Bool, Type::Bool),
        BoundUnaryOperator::new(U::OnesComplement, OnesComplement, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::PreIncrement, PreIncrement, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::PreIncrement, PreIncrement, Type::Float, Type::Float),
        BoundUnaryOperator::new(U::PreDecrement, PreDecrement, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::PreDecrement, PreDecrement, Type::Float, Type::Float),
        BoundUnaryOperator::new(U::PostIncrement, PostIncrement, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::PostIncrement, PostIncrement, Type::Float, Type::Float),
        BoundUnaryOperator::new(U::PostDecrement, PostDecrement, Type::Int, Type::Int),
        BoundUnaryOperator::new(U::PostDecrement, PostDecrement, Type::Float, Type::Float),
    ]
};

// ---------------------------------------------------------------------------
// Binary operators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundBinaryOperatorKind {
    Addition,
    Subtraction,
    Multiplication,
    Division,
    Remainder,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equality,
    Inequality,
    BitwiseAnd,
    BitwiseXor,
    BitwiseOr,
    LogicalAnd,
    LogicalOr,
    Concatenation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundBinaryOperator {
    pub syntax: BinaryOperator,
    pub kind: BoundBinaryOperatorKind,
    pub left_type: Type,
    pub right_type: Type,
    pub result_type: Type,
}

impl BoundBinaryOperator {
    const fn new(
        syntax: BinaryOperator,
        kind: BoundBinaryOperatorKind,
        operands: Type,
        result: Type,
    ) -> Self {
        Self {
            syntax,
            kind,
            left_type: operands,
            right_type: operands,
            result_type: result,
        }
    }

    pub fn bind(
        syntax: BinaryOperator,
        left: Type,
        right: Type,
    ) -> Option<&'static BoundBinaryOperator> {
        BINARY_OPERATORS
            .iter()
            .find(|op| op.syntax == syntax && op.left_type == left && op.right_type == right)
    }
}

static BINARY_OPERATORS: [BoundBinaryOperator; 41] = {
    use BinaryOperator as B;
    use BoundBinaryOperatorKind::*;
    [
        // int arithmetic
        BoundBinaryOperator::new(B::Add, Addition, Type::Int, Type::Int),
        BoundBinaryOperator::new(B::Subtract, Subtraction, Type::Int, Type::Int),
        BoundBinaryOperator::new(B::Multiply, Multiplication, Type::Int, Type::Int),
        BoundBinaryOperator::new(B::Divide, Division, Type::Int, Type::Int),
        BoundBinaryOperator::new(B::Modulo, Remainder, Type::Int, Type::Int),
        // int bitwise
        BoundBinaryOperator::new(B::BitwiseAnd, BitwiseAnd, Type::Int, Type::Int),
        BoundBinaryOperator::new(B::BitwiseXor, BitwiseXor, Type::Int, Type::Int),
        BoundBinaryOperator::new(B::BitwiseOr, BitwiseOr, Type::Int, Type::Int),
        // int comparisons
        BoundBinaryOperator::new(B::Less, Less, Type::Int, Type::Bool),
        BoundBinaryOperator::new(B::LessOrEqual, LessOrEqual, Type::Int, Type::Bool),
        BoundBinaryOperator::new(B::Greater, Greater, Type::Int, Type::Bool),
        BoundBinaryOperator::new(B::GreaterOrEqual, GreaterOrEqual, Type::Int, Type::Bool),
        BoundBinaryOperator::new(B::Equal, Equality, Type::Int, Type::Bool),
        BoundBinaryOperator::new(B::NotEqual, Inequality, Type::Int, Type::Bool),
        // float arithmetic
        BoundBinaryOperator::new(B::Add, Addition, Type::Float, Type::Float),
        BoundBinaryOperator::new(B::Subtract, Subtraction, Type::Float, Type::Float),
        BoundBinaryOperator::new(B::Multiply, Multiplication, Type::Float, Type::Float),
        BoundBinaryOperator::new(B::Divide, Division, Type::Float, Type::Float),
        BoundBinaryOperator::new(B::Modulo, Remainder, Type::Float, Type::Float),
        // float comparisons
        BoundBinaryOperator::new(B::Less, Less, Type::Float, Type::Bool),
        BoundBinaryOperator::new(B::LessOrEqual, LessOrEqual, Type::Float, Type::Bool),
        BoundBinaryOperator::new(B::Greater, Greater, Type::Float, Type::Bool),
        BoundBinaryOperator::new(B::GreaterOrEqual, GreaterOrEqual, Type::Float, Type::Bool),
        BoundBinaryOperator::new(B::Equal, Equality, Type::Float, Type::Bool),
        BoundBinaryOperator::new(B::NotEqual, Inequality, Type::Float, Type::Bool),
        // bool
        BoundBinaryOperator::new(B::Equal, Equality, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(B::NotEqual, Inequality, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(B::BitwiseAnd, BitwiseAnd, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(B::BitwiseXor, BitwiseXor, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(B::BitwiseOr, BitwiseOr, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(B::LogicalAnd, LogicalAnd, Type::Bool, Type::Bool),
        BoundBinaryOperator::new(B::LogicalOr, LogicalOr, Type::Bool, Type::Bool),
        // string
        BoundBinaryOperator::new(B::Add, Concatenation, Type::String, Type::String),
        BoundBinaryOperator::new(B::Equal, Equality, Type::String, Type::Bool),
        BoundBinaryOperator::new(B::NotEqual, Inequality, Type::String, Type::Bool),
        // char
        BoundBinaryOperator::new(B::Equal, Equality, Type::Char, Type::Bool),
        BoundBinaryOperator::new(B::NotEqual, Inequality, Type::Char, Type::Bool),
        BoundBinaryOperator::new(B::Less, Less, Type::Char, Type::Bool),
        BoundBinaryOperator::new(B::LessOrEqual, LessOrEqual, Type::Char, Type::Bool),
        BoundBinaryOperator::new(B::Greater, Greater, Type::Char, Type::Bool),
        BoundBinaryOperator::new(B::GreaterOrEqual, GreaterOrEqual, Type::Char, Type::Bool),
    ]
};
