/// Operator-specific options attached to an expression node.
///
/// Each operator family reads only its own variant; the accessors below fall
/// back to the family default when a node carries something else.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Prefs {
    #[default]
    None,
    /// Literal scalar produced by a VALUE node
    Value(Literal),
    Traverse(TraversePrefs),
    RecursiveDescent(RecursiveDescentPrefs),
    Assign(AssignPrefs),
    Multiply(MultiplyPrefs),
    Compare(ComparePrefs),
    Variable(VariablePrefs),
    Encode(EncodePrefs),
    Decode(DecodeFormat),
    Comments(CommentPrefs),
}

impl Prefs {
    pub fn traverse(&self) -> TraversePrefs {
        match self {
            Prefs::Traverse(prefs) => *prefs,
            Prefs::RecursiveDescent(prefs) => prefs.traverse,
            _ => TraversePrefs::default(),
        }
    }

    pub fn assign(&self) -> AssignPrefs {
        match self {
            Prefs::Assign(prefs) => *prefs,
            Prefs::Multiply(prefs) => prefs.assign,
            _ => AssignPrefs::default(),
        }
    }

    pub fn variable(&self) -> VariablePrefs {
        match self {
            Prefs::Variable(prefs) => *prefs,
            _ => VariablePrefs::default(),
        }
    }

    pub fn comments(&self) -> CommentPrefs {
        match self {
            Prefs::Comments(prefs) => *prefs,
            _ => CommentPrefs::default(),
        }
    }
}

/// A scalar literal as written in the expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversePrefs {
    /// `.a?` / `.[]?`: swallow type errors instead of failing
    pub optional: bool,
    pub include_map_keys: bool,
    pub dont_include_map_values: bool,
    pub dont_follow_alias: bool,
    /// Disable glob matching of keys
    pub exact_key_match: bool,
    pub dont_auto_create: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecursiveDescentPrefs {
    pub recurse_array: bool,
    pub traverse: TraversePrefs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignPrefs {
    pub dont_overwrite_anchor: bool,
    pub only_write_null: bool,
    pub clobber_custom_tags: bool,
}

/// How arrays found at the same path on both sides of a merge combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayMergePolicy {
    /// Merge element by element, index against index
    #[default]
    Update,
    /// The right array replaces the left one
    Overwrite,
    /// Right elements are appended after left elements
    Append,
}

/// How comments on the right side of a merge land on the left side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentsPolicy {
    #[default]
    SetIfBlank,
    Ignore,
    Overwrite,
    Append,
}

impl CommentsPolicy {
    pub fn apply(self, target: &mut String, source: &str, separator: &str) {
        match self {
            CommentsPolicy::SetIfBlank => {
                if target.is_empty() {
                    *target = source.to_string();
                }
            }
            CommentsPolicy::Ignore => {}
            CommentsPolicy::Overwrite => *target = source.to_string(),
            CommentsPolicy::Append => {
                if source.is_empty() {
                    return;
                }
                if !target.is_empty() {
                    target.push_str(separator);
                }
                target.push_str(source);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultiplyPrefs {
    pub arrays: ArrayMergePolicy,
    pub comments: CommentsPolicy,
    /// `*?`: only merge keys that already exist on the left
    pub only_existing: bool,
    pub assign: AssignPrefs,
}

impl Default for MultiplyPrefs {
    fn default() -> Self {
        MultiplyPrefs {
            arrays: ArrayMergePolicy::Overwrite,
            comments: CommentsPolicy::SetIfBlank,
            only_existing: false,
            assign: AssignPrefs::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComparePrefs {
    pub greater: bool,
    pub or_equal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VariablePrefs {
    /// `ref` binds the matched nodes themselves instead of copies
    pub is_reference: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeFormat {
    #[default]
    Json,
    Csv,
    Tsv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncodePrefs {
    pub format: EncodeFormat,
    pub indent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeFormat {
    #[default]
    Json,
}

/// Which comment slots a comment operator reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommentPrefs {
    pub head: bool,
    pub line: bool,
    pub foot: bool,
}
