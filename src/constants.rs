//! Global Constants
//!
//! Centralized constants for discovery, extraction and scoring.
//! Tunable values have a config counterpart; the rest are fixed rules.

/// Project walk rules
pub mod walk {
    /// Path segments that exclude a file from the walk
    pub const EXCLUDED_SEGMENTS: &[&str] = &["build", "target", "dist"];

    /// Paths containing this marker are never excluded
    pub const TAGS_OVERRIDE: &str = "WEB-INF/tags";
}

/// Construct extraction constants
pub mod extraction {
    /// Tag prefixes of the standard tag libraries (never custom tags)
    pub const STANDARD_PREFIXES: &[&str] = &["c", "fmt", "sql", "x", "fn", "jsp"];

    /// JSTL tags that add a branch to the cyclomatic count
    pub const JSTL_BRANCH_TAGS: &[&str] = &["if", "when", "choose", "forEach"];

    /// Markers that make an include target a runtime expression
    pub const DYNAMIC_MARKERS: &[&str] = &["${", "#{", "<%"];

    /// Words followed by `(` in JavaScript that are not calls
    pub const JS_NON_CALLS: &[&str] = &[
        "if", "for", "while", "switch", "catch", "function", "return", "typeof",
    ];
}

/// Include resolution constants
pub mod resolution {
    /// Segment that identifies a webapp root (its parent directory)
    pub const WEB_INF: &str = "WEB-INF";

    /// Node id prefix for literal targets that matched no discovered file
    pub const UNRESOLVED_PREFIX: &str = "unresolved:";

    /// Node id prefix for expression-valued targets
    pub const DYNAMIC_PREFIX: &str = "dynamic:";

    /// Conventional home of tag files, preferred on basename ties
    pub const TAGS_DIR: &str = "WEB-INF/tags/";

    /// Tag file extensions, in lookup order
    pub const TAG_EXTENSIONS: &[&str] = &["tag", "tagx"];
}

/// Complexity scoring defaults
pub mod scoring {
    /// Scores at or above this are at least medium
    pub const DEFAULT_MEDIUM_THRESHOLD: f64 = 5.0;

    /// Scores at or above this are high
    pub const DEFAULT_HIGH_THRESHOLD: f64 = 15.0;

    /// Lines are weighted per this many lines
    pub const LINES_NORMALIZER: f64 = 100.0;
}

/// Finding thresholds
pub mod findings {
    /// Files larger than this many bytes are flagged
    pub const DEFAULT_LARGE_FILE_BYTES: u64 = 30_000;

    /// Files with more scriptlets than this are flagged
    pub const DEFAULT_EXCESSIVE_SCRIPTLETS: usize = 5;
}

/// Report defaults
pub mod report {
    /// Number of files in the most-complex ranking
    pub const DEFAULT_TOP_N: usize = 10;

    /// Number of files in the most-included ranking
    pub const DEFAULT_MOST_INCLUDED_N: usize = 5;

    /// Default output file prefix
    pub const DEFAULT_PREFIX: &str = "jsp_analysis";

    /// Default output directory, relative to the working directory
    pub const DEFAULT_OUTPUT_DIR: &str = "output";
}
