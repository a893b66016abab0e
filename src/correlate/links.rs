use url::Url;

/// Web page of a task on the task execution backend.
///
/// # Arguments
///
/// * `tasks_host` - Backend root URL (e.g., <https://firefox-ci-tc.services.mozilla.com>)
/// * `task_id` - Task identifier
///
/// # Returns
///
/// Clickable URL to the task (e.g., <https://firefox-ci-tc.services.mozilla.com/tasks/abc>)
pub fn task_url(tasks_host: &str, task_id: &str) -> String {
    format!("{}/tasks/{task_id}", tasks_host.trim_end_matches('/'))
}

/// Dashboard view of all jobs for one revision of a project.
///
/// # Arguments
///
/// * `dashboard_host` - Dashboard base URL (e.g., <https://treeherder.mozilla.org>)
/// * `project` - Dashboard project (e.g., "firefox-android")
/// * `revision` - Revision to filter on
pub fn pushlog_url(dashboard_host: &str, project: &str, revision: &str) -> String {
    format!(
        "{}/jobs?repo={project}&revision={revision}",
        dashboard_host.trim_end_matches('/')
    )
}

/// Browse-by-revision page of a plain-commit repository.
///
/// Returns `None` if `repository` is not an absolute URL.
pub fn revision_url(repository: &str, revision: &str) -> Option<String> {
    let mut url = Url::parse(repository).ok()?;
    let path = format!("{}/rev/{revision}", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);
    Some(url.to_string())
}

/// `owner/name` slug of a hosted repository URL.
pub fn repository_slug(repository: &str) -> Option<String> {
    let url = Url::parse(repository).ok()?;
    let slug = url.path().trim_matches('/');
    let slug = slug.strip_suffix(".git").unwrap_or(slug);
    (!slug.is_empty()).then(|| slug.to_string())
}
