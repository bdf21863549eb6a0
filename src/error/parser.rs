#[derive(thiserror::Error, Debug)]
pub enum ParserError {
	/// Internal compiler error, should never happen
	#[error("{0}")]
	InternalError(#[from] anyhow::Error),
	#[error(transparent)]
	ParseError(#[from] ParseError),
}

/// A rejected program, with the position the parser had reached.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {type}")]
pub struct ParseError {
	pub line:    usize,
	pub section: String,
	/// Function being compiled when the error occurred
	pub scope:   Option<String>,
	pub r#type:  ParseErrorType,
}

impl ParseError {
	pub fn new(line: usize, section: impl Into<String>, scope: Option<String>, r#type: ParseErrorType) -> Self {
		Self { line, section: section.into(), scope, r#type }
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorType {
	ExpectedExpression,
	ExpectedVartype(String),
	Expected { expected: String, found: String },
	Unexpected(String),
	Undefined(String),
	AlreadyDefined(String),
	QualifierNotAllowed { qualifier: String, context: String },
	ProtectedAndWriteprotected,
	StringInStruct,
	StructMemberByValue,
	ForwardDeclaredStruct(String),
	ForwardDeclarationNotManaged(String),
	InvalidExtends,
	MustExtendStruct,
	NotPublicMember { member: String, strct: String },
	ProtectedAccess(String),
	NonStaticThroughType { member: String, strct: String },
	ManagedByValue(String),
	NonPointerStructArray,
	NonManagedStructArray,
	PointerToNonManaged(String),
	VoidVariable,
	OldStringsDisabled,
	ArraySize(String),
	VariableTooLarge { name: String, size: usize },
	TypeMismatch { from: String, to: String },
	OperatorType { operator: String, vartype: String },
	LiteralTooLarge { literal: String, max: String },
	LiteralTooSmall { literal: String, min: String },
	LiteralOverflow(String),
	FloatOutOfRange(String),
	DefaultNotLiteral,
	PointerDefault,
	EnumOverflow(String),
	GlobalInitializer(String),
	ImportInitializer(String),
	AlreadyImported(String),
	ReferencedAsImport(String),
	ImportMismatch(String),
	SignatureMismatch(String),
	FunctionRedefined(String),
	ImportWithBody(String),
	BodyInStruct,
	AttributeFunction,
	ImportMemberVariable,
	StaticMemberVariable,
	MemberFunctionOwner { function: String, strct: String },
	NeverDefined(String),
	ParamNeedsName(usize),
	VoidParameter,
	EllipsisNotLast,
	NotEnoughArgs(String),
	TooManyArgs(String),
	VoidValue,
	TypeAsValue(String),
	ArrayAsValue(String),
	StructAsValue(String),
	NoEffect,
	NotAssignable(String),
	ReadOnly(String),
	ReadonlyModified(String),
	NotArray(String),
	NotStruct(String),
	NotCallable(String),
	OutsideLoop(String),
	OutsideSwitch(String),
	DuplicateDefault,
	DeclarationInSwitch,
	ReturnValueFromVoid,
	MissingReturnValue,
	ThisOutsideMember,
	NewNonManaged(String),
	NewBuiltin(String),
	ExportUndefined(String),
}

impl std::fmt::Display for ParseErrorType {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		use ParseErrorType::*;
		match self {
			ExpectedExpression => {
				write!(f, "Expected an expression")
			}
			ExpectedVartype(found) => {
				write!(f, "Expected a variable type instead of '{found}'")
			}
			Expected { expected, found } => {
				write!(f, "Expected {expected} instead of '{found}'")
			}
			Unexpected(found) => {
				write!(f, "Unexpected '{found}'")
			}
			Undefined(name) => {
				write!(f, "Identifier '{name}' is undeclared")
			}
			AlreadyDefined(name) => {
				write!(f, "'{name}' is already defined")
			}
			QualifierNotAllowed { qualifier, context } => {
				write!(f, "'{qualifier}' is not allowed {context}")
			}
			ProtectedAndWriteprotected => {
				write!(f, "Field cannot be both protected and write-protected.")
			}
			StringInStruct => {
				write!(f, "'string' not allowed inside struct")
			}
			StructMemberByValue => {
				write!(f, "Member variable cannot be struct")
			}
			ForwardDeclaredStruct(name) => {
				write!(f, "Invalid use of forward-declared struct '{name}'")
			}
			ForwardDeclarationNotManaged(name) => {
				write!(f, "Forward-declared struct '{name}' must be 'managed'")
			}
			InvalidExtends => {
				write!(f, "Invalid use of 'extends'")
			}
			MustExtendStruct => {
				write!(f, "Must extend a struct type")
			}
			NotPublicMember { member, strct } => {
				write!(
					f,
					"'{member}' is not a public member of '{strct}'. Are you sure you spelt it correctly (remember, \
					 capital letters are important)?"
				)
			}
			ProtectedAccess(member) => {
				write!(f, "Cannot access protected member '{member}'")
			}
			NonStaticThroughType { member, strct } => {
				write!(f, "Must have an instance of '{strct}' to access the non-static member '{member}'")
			}
			ManagedByValue(name) => {
				write!(f, "Cannot declare a variable of managed type '{name}', use a pointer instead")
			}
			NonPointerStructArray => {
				write!(f, "cannot pass non-pointer struct array")
			}
			NonManagedStructArray => {
				write!(f, "cannot pass non-managed struct array")
			}
			PointerToNonManaged(name) => {
				write!(f, "Cannot declare a pointer to non-managed type '{name}'")
			}
			VoidVariable => {
				write!(f, "Cannot declare a variable of type 'void'")
			}
			OldStringsDisabled => {
				write!(f, "Type 'string' is no longer supported; use 'String' instead")
			}
			ArraySize(found) => {
				write!(f, "Expected a positive integer array size instead of '{found}'")
			}
			VariableTooLarge { name, size } => {
				write!(f, "'{name}' is too large ({size} bytes, max. is {})", i32::MAX)
			}
			TypeMismatch { from, to } => {
				write!(f, "Type mismatch: cannot convert '{from}' to '{to}'")
			}
			OperatorType { operator, vartype } => {
				write!(f, "Operator '{operator}' cannot be applied to '{vartype}'")
			}
			LiteralTooLarge { literal, max } => {
				write!(f, "Literal value '{literal}' is too large (max. is {max})")
			}
			LiteralTooSmall { literal, min } => {
				write!(f, "Literal value '{literal}' is too small (min. is {min})")
			}
			LiteralOverflow(literal) => {
				write!(f, "Could not parse integer symbol '{literal}' because of overflow.")
			}
			FloatOutOfRange(literal) => {
				write!(f, "Float literal '{literal}' is out of range")
			}
			DefaultNotLiteral => {
				write!(f, "Parameter default value must be literal")
			}
			PointerDefault => {
				write!(f, "A pointer parameter can only default to 0 or 'null'")
			}
			EnumOverflow(name) => {
				write!(f, "Overflow when calculating the value of enum member '{name}'")
			}
			GlobalInitializer(name) => {
				write!(f, "Expected a literal value to initialize '{name}'")
			}
			ImportInitializer(name) => {
				write!(f, "Imported variable '{name}' cannot be initialized")
			}
			AlreadyImported(name) => {
				write!(f, "'{name}' is already imported")
			}
			ReferencedAsImport(name) => {
				write!(f, "Already referenced name as import; you must define '{name}' before using it")
			}
			ImportMismatch(name) => {
				write!(f, "The type of '{name}' differs from its import declaration")
			}
			SignatureMismatch(name) => {
				write!(f, "Function '{name}' does not match its earlier declaration")
			}
			FunctionRedefined(name) => {
				write!(f, "Function '{name}' is already defined")
			}
			ImportWithBody(name) => {
				write!(f, "Imported function '{name}' cannot have a body")
			}
			BodyInStruct => {
				write!(f, "Cannot define a function body inside a struct")
			}
			AttributeFunction => {
				write!(f, "An attribute cannot be a function")
			}
			ImportMemberVariable => {
				write!(f, "Struct member variables cannot be imported")
			}
			StaticMemberVariable => {
				write!(f, "Static struct member variables are not supported")
			}
			MemberFunctionOwner { function, strct } => {
				write!(f, "'{function}' has not been declared as a member function of '{strct}'")
			}
			NeverDefined(name) => {
				write!(f, "Function '{name}' is called but never defined")
			}
			ParamNeedsName(index) => {
				write!(f, "Parameter {index} of a function definition must have a name")
			}
			VoidParameter => {
				write!(f, "A parameter cannot have the type 'void'")
			}
			EllipsisNotLast => {
				write!(f, "'...' must be the last parameter")
			}
			NotEnoughArgs(name) => {
				write!(f, "Not enough parameters in call to function '{name}'")
			}
			TooManyArgs(name) => {
				write!(f, "Too many parameters in call to function '{name}'")
			}
			VoidValue => {
				write!(f, "A 'void' result cannot be used as a value")
			}
			TypeAsValue(name) => {
				write!(f, "The type '{name}' cannot be used as a value")
			}
			ArrayAsValue(name) => {
				write!(f, "The array '{name}' cannot be used as a value, use an index")
			}
			StructAsValue(name) => {
				write!(f, "A '{name}' struct cannot be used as a value")
			}
			NoEffect => {
				write!(f, "This expression has no effect")
			}
			NotAssignable(name) => {
				write!(f, "Cannot assign a value to '{name}'")
			}
			ReadOnly(name) => {
				write!(f, "'{name}' is read-only")
			}
			ReadonlyModified(name) => {
				write!(f, "'{name}' is declared 'readonly' and cannot be modified")
			}
			NotArray(name) => {
				write!(f, "'{name}' is not an array")
			}
			NotStruct(name) => {
				write!(f, "'{name}' is not a struct, it has no members")
			}
			NotCallable(name) => {
				write!(f, "'{name}' is not a function")
			}
			OutsideLoop(keyword) => {
				write!(f, "'{keyword}' is only allowed inside a loop")
			}
			OutsideSwitch(label) => {
				write!(f, "'{label}' is only allowed directly within a 'switch' block")
			}
			DuplicateDefault => {
				write!(f, "This switch block already has a 'default' label")
			}
			DeclarationInSwitch => {
				write!(f, "Cannot use declarations directly within a switch body, put '{{ ... }}' around them")
			}
			ReturnValueFromVoid => {
				write!(f, "Cannot return a value from a 'void' function")
			}
			MissingReturnValue => {
				write!(f, "This function must return a value")
			}
			ThisOutsideMember => {
				write!(f, "'this' can only be used in non-static member functions")
			}
			NewNonManaged(name) => {
				write!(f, "Cannot use 'new' with the non-managed type '{name}'")
			}
			NewBuiltin(name) => {
				write!(f, "Built-in type '{name}' cannot be instantiated with 'new'")
			}
			ExportUndefined(name) => {
				write!(f, "Can only export global variables and functions defined in this script, not '{name}'")
			}
		}
	}
}
