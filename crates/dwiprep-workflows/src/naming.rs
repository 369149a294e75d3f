//! Graph names.

use std::path::Path;

/// Run graph name derived from the diffusion filename.
///
/// The subject entity is dropped and the `dwi` suffix becomes `wf`:
/// `sub-01_dir-AP_acq-64grad_dwi.nii.gz` gives `dwi_preproc_dir_AP_acq_64grad_wf`.
pub fn workflow_name(dwi: &Path) -> String {
    let file_name = dwi
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name
        .rsplit_once(".nii")
        .map_or(file_name.as_str(), |(stem, _)| stem)
        .replace("_dwi", "_wf");
    let without_subject = stem.split_once('_').map_or("", |(_, rest)| rest);
    let cleaned = without_subject
        .replace('.', "_")
        .replace(' ', "")
        .replace('-', "_");
    format!("dwi_preproc_{cleaned}")
}

/// Name of the merged per-subject graph.
pub fn subject_graph_name(subject: &str) -> String {
    format!("single_subject_{subject}_wf")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workflow_name() {
        let name = |path: &str| workflow_name(Path::new(path));
        assert_eq!(
            name("/made/up/sub-01_dir-AP_acq-64grad_dwi.nii.gz"),
            "dwi_preproc_dir_AP_acq_64grad_wf"
        );
        assert_eq!(
            name("sub-01_dir-RL_run-01_echo-1_dwi.nii.gz"),
            "dwi_preproc_dir_RL_run_01_echo_1_wf"
        );
        assert_eq!(name("sub-01_ses-1_dwi.nii"), "dwi_preproc_ses_1_wf");
        assert_eq!(name("sub-01_dwi.nii.gz"), "dwi_preproc_wf");
    }

    #[test]
    fn test_subject_graph_name() {
        assert_eq!(subject_graph_name("01"), "single_subject_01_wf");
    }
}
