use crate::deploy::validate_directory;
use crate::server::dto::EditDeploymentRequest;
use crate::server::response::ApiError;

const MAX_NAME_LEN: usize = 100;
const MAX_REPOSITORY_LEN: usize = 2048;

pub fn validate_edit_request(request: &EditDeploymentRequest) -> Result<(), ApiError> {
    if let Some(name) = &request.name {
        if name.is_empty() {
            return Err(ApiError::bad_request("Name cannot be empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(ApiError::bad_request(format!(
                "Name cannot exceed {MAX_NAME_LEN} characters"
            )));
        }
    }

    if let Some(directory) = &request.directory {
        validate_directory(directory).map_err(ApiError::from)?;
    }

    if let Some(repository) = &request.repository {
        if repository.is_empty() {
            return Err(ApiError::bad_request("Repository cannot be empty"));
        }
        if repository.len() > MAX_REPOSITORY_LEN {
            return Err(ApiError::bad_request("Repository URL is too long"));
        }
        const INVALID_CHARS: &[char] = &['\0', '\n', '\r'];
        if repository.chars().any(|c| INVALID_CHARS.contains(&c)) {
            return Err(ApiError::bad_request(
                "Repository contains invalid characters",
            ));
        }
    }

    Ok(())
}
