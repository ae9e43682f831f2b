use crate::codemodel::Access;
use crate::naming::normalize_signature;

use super::{ClassId, MetaType};

/// What kind of member a function is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Constructor,
    CopyConstructor,
    MoveConstructor,
    Destructor,
    AssignmentOperator,
    MoveAssignmentOperator,
    ConversionOperator,
    Operator,
    Normal,
}

/// One argument of a [`MetaFunction`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetaArgument {
    name: String,
    ty: MetaType,
    index: usize,
    original_default_value: Option<String>,
    default_value: Option<String>,
    removed: bool,
}

impl MetaArgument {
    pub fn new(name: impl Into<String>, ty: MetaType, index: usize) -> Self {
        Self {
            name: name.into(),
            ty,
            index,
            original_default_value: None,
            default_value: None,
            removed: false,
        }
    }

    /// Set the default value found in the header.
    pub fn with_default_value(mut self, expression: impl Into<String>) -> Self {
        let expression = expression.into();
        self.original_default_value = Some(expression.clone());
        self.default_value = Some(expression);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &MetaType {
        &self.ty
    }

    /// 0-based position in the declaration.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    pub fn original_default_value_expression(&self) -> Option<&str> {
        self.original_default_value.as_deref()
    }

    pub fn default_value_expression(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    pub fn has_default_value_expression(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn has_original_default_value_expression(&self) -> bool {
        self.original_default_value.is_some()
    }

    /// A default from the header that no rule has changed.
    pub fn has_unmodified_default_value_expression(&self) -> bool {
        self.original_default_value.is_some() && self.original_default_value == self.default_value
    }

    /// A default introduced or replaced by a rule.
    pub fn has_modified_default_value_expression(&self) -> bool {
        self.default_value.is_some() && self.original_default_value != self.default_value
    }

    pub(crate) fn set_default_value_expression(&mut self, expression: Option<String>) {
        self.default_value = expression;
    }

    pub(crate) fn set_removed(&mut self, removed: bool) {
        self.removed = removed;
    }
}

/// A function or method. Overloads are separate values sharing a name.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaFunction {
    pub(crate) name: String,
    pub(crate) kind: FunctionKind,
    pub(crate) access: Access,
    pub(crate) arguments: Vec<MetaArgument>,
    pub(crate) return_type: MetaType,
    pub(crate) owner: Option<ClassId>,
    pub(crate) is_static: bool,
    pub(crate) is_virtual: bool,
    pub(crate) is_abstract: bool,
    pub(crate) is_constant: bool,
    pub(crate) is_deprecated: bool,
    pub(crate) user_added: bool,
}

impl MetaFunction {
    pub fn new(name: impl Into<String>, kind: FunctionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            access: Access::Public,
            arguments: Vec::new(),
            return_type: MetaType::void(),
            owner: None,
            is_static: false,
            is_virtual: false,
            is_abstract: false,
            is_constant: false,
            is_deprecated: false,
            user_added: false,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_argument(mut self, argument: MetaArgument) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_return_type(mut self, ty: MetaType) -> Self {
        self.return_type = ty;
        self
    }

    pub fn with_user_added(mut self, user_added: bool) -> Self {
        self.user_added = user_added;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn arguments(&self) -> &[MetaArgument] {
        &self.arguments
    }

    pub(crate) fn arguments_mut(&mut self) -> &mut [MetaArgument] {
        &mut self.arguments
    }

    pub fn return_type(&self) -> &MetaType {
        &self.return_type
    }

    /// The class declaring the function, `None` for global functions.
    pub fn owner(&self) -> Option<ClassId> {
        self.owner
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_constant(&self) -> bool {
        self.is_constant
    }

    pub fn is_deprecated(&self) -> bool {
        self.is_deprecated
    }

    /// Declared in the type rules rather than the headers.
    pub fn is_user_added(&self) -> bool {
        self.user_added
    }

    pub fn is_private(&self) -> bool {
        self.access == Access::Private
    }

    pub fn is_protected(&self) -> bool {
        self.access == Access::Protected
    }

    pub fn is_public(&self) -> bool {
        self.access == Access::Public
    }

    pub fn is_constructor(&self) -> bool {
        matches!(
            self.kind,
            FunctionKind::Constructor | FunctionKind::CopyConstructor | FunctionKind::MoveConstructor
        )
    }

    pub fn is_operator_overload(&self) -> bool {
        matches!(
            self.kind,
            FunctionKind::Operator
                | FunctionKind::AssignmentOperator
                | FunctionKind::MoveAssignmentOperator
                | FunctionKind::ConversionOperator
        )
    }

    /// Arguments not removed by a modification rule.
    pub fn visible_arguments(&self) -> impl Iterator<Item = &MetaArgument> {
        self.arguments.iter().filter(|a| !a.is_removed())
    }

    /// Declaration-like signature, e.g. `move(int dx, int dy = 0)`.
    pub fn signature(&self) -> String {
        let arguments: Vec<_> = self
            .arguments
            .iter()
            .map(|a| {
                let mut text = a.ty().cpp_signature();
                if !a.name().is_empty() {
                    text.push(' ');
                    text.push_str(a.name());
                }
                if let Some(value) = a.original_default_value_expression() {
                    text.push_str(" = ");
                    text.push_str(value);
                }
                text
            })
            .collect();
        let mut signature = format!("{}({})", self.name, arguments.join(", "));
        if self.is_constant {
            signature.push_str(" const");
        }
        signature
    }

    /// Name and argument types only, e.g. `move(int,int)`; used to match rules.
    pub fn minimal_signature(&self) -> String {
        let arguments: Vec<_> = self.arguments.iter().map(|a| a.ty().cpp_signature()).collect();
        let mut signature = format!("{}({})", self.name, arguments.join(","));
        if self.is_constant {
            signature.push_str("const");
        }
        normalize_signature(&signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codemodel::ReferenceType;
    use crate::types::TypeEntry;
    use std::rc::Rc;

    #[test]
    fn test_default_value_predicates() {
        let int = MetaType::new(Rc::new(TypeEntry::cpp_primitive("int")));
        let plain = MetaArgument::new("x", int.clone(), 0);
        assert!(!plain.has_default_value_expression());
        assert!(!plain.has_modified_default_value_expression());

        let mut arg = MetaArgument::new("y", int, 1).with_default_value("0");
        assert!(arg.has_unmodified_default_value_expression());
        assert!(!arg.has_modified_default_value_expression());

        arg.set_default_value_expression(Some("42".to_string()));
        assert!(arg.has_original_default_value_expression());
        assert!(arg.has_modified_default_value_expression());
        assert!(!arg.has_unmodified_default_value_expression());

        arg.set_default_value_expression(None);
        assert!(!arg.has_default_value_expression());
        assert!(!arg.has_modified_default_value_expression());
    }

    #[test]
    fn test_signatures() {
        let int = MetaType::new(Rc::new(TypeEntry::cpp_primitive("int")));
        let point = MetaType::new(Rc::new(TypeEntry::value_type("Point")))
            .with_const(true)
            .with_reference(ReferenceType::LValueReference);
        let mut function = MetaFunction::new("moveTo", FunctionKind::Normal)
            .with_argument(MetaArgument::new("target", point, 0))
            .with_argument(MetaArgument::new("speed", int, 1).with_default_value("1"));
        function.is_constant = true;

        assert_eq!(function.signature(), "moveTo(const Point & target, int speed = 1) const");
        assert_eq!(function.minimal_signature(), "moveTo(const Point&,int)const");
    }
}
