use std::path::Path;

/// Filename and path matching rules for a single job number.
///
/// The job number is an operator-supplied correlation key, not a validated
/// identifier; matching is plain substring containment. Directory matching is
/// case-insensitive because the staged trees mix operator-typed state and
/// city names with tool-generated segments.
pub struct NameFilter {
    job_number: String,
    processed_marker: String,
}

impl NameFilter {
    pub fn new<S: Into<String>>(job_number: S, processed_marker: S) -> Self {
        Self {
            job_number: job_number.into(),
            processed_marker: processed_marker.into(),
        }
    }

    pub fn job_number(&self) -> &str {
        &self.job_number
    }

    /// Whether a downloaded file should be treated as a job archive. Archives
    /// renamed with the processed marker are excluded, so re-running the
    /// setup stage never re-stages the same download.
    pub fn is_job_archive(&self, file_name: &str) -> bool {
        file_name.contains(&self.job_number) && !self.is_processed(file_name)
    }

    pub fn is_processed(&self, file_name: &str) -> bool {
        file_stem(file_name).ends_with(&self.processed_marker)
    }

    /// The rename target flagging an archive as staged:
    /// `550491_oak_harbor.zip` becomes `550491_oak_harbor_processed.zip`.
    pub fn processed_name(&self, file_name: &str) -> String {
        match file_name.rsplit_once('.') {
            Some((stem, ext)) => format!("{}{}.{}", stem, self.processed_marker, ext),
            None => format!("{}{}", file_name, self.processed_marker),
        }
    }

    /// Directory discovery predicate: the path must contain the job number
    /// and every `required` token, and none of the `excluded` tokens, all
    /// case-insensitively.
    pub fn dir_matches(&self, path: &Path, required: &[&str], excluded: &[&str]) -> bool {
        let haystack = path.to_string_lossy().to_lowercase();

        if !haystack.contains(&self.job_number.to_lowercase()) {
            return false;
        }

        if !required.iter().all(|token| haystack.contains(&token.to_lowercase())) {
            return false;
        }

        !excluded.iter().any(|token| haystack.contains(&token.to_lowercase()))
    }
}

pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}
