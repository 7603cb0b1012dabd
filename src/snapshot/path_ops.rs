use toml::Value;

use crate::ConfigError;

/// Navigates through a TOML value structure following a dot-separated path
///
/// # Arguments
/// * `value` - The root TOML value to navigate from
/// * `path` - Dot-separated path (e.g., "server.port" or "array.0.field")
///
/// # Errors
/// * `ConfigError::InvalidPath` - If the path doesn't exist or is malformed
pub(crate) fn navigate_path<'a>(value: &'a Value, path: &str) -> Result<&'a Value, ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::InvalidPath("Empty path".to_string()));
    }

    let parts: Vec<&str> = path.split('.').collect();
    let mut current = value;

    for (i, part) in parts.iter().enumerate() {
        match current {
            Value::Table(table) => {
                current = table.get(*part).ok_or_else(|| {
                    ConfigError::InvalidPath(format!(
                        "Key '{}' not found in table at path '{}'",
                        part,
                        parts[..i].join(".")
                    ))
                })?;
            }
            Value::Array(array) => {
                let index = part.parse::<usize>().map_err(|_| {
                    ConfigError::InvalidPath(format!(
                        "Invalid array index '{}' at path '{}'",
                        part,
                        parts[..i].join(".")
                    ))
                })?;

                current = array.get(index).ok_or_else(|| {
                    ConfigError::InvalidPath(format!(
                        "Array index '{}' out of bounds at path '{}'",
                        index,
                        parts[..i].join(".")
                    ))
                })?;
            }
            _ => {
                return Err(ConfigError::InvalidPath(format!(
                    "Cannot navigate into {} at path '{}'",
                    current.type_str(),
                    parts[..i].join("."),
                )));
            }
        }
    }

    Ok(current)
}

/// Sets a value at the specified path, creating intermediate tables as needed
///
/// # Errors
/// * `ConfigError::InvalidPath` - If the path is empty or crosses a non-container value
pub(crate) fn set_value_at_path(
    value: &mut Value,
    path: &str,
    new_value: Value,
) -> Result<(), ConfigError> {
    if path.is_empty() {
        return Err(ConfigError::InvalidPath("Empty path".to_string()));
    }

    let parts: Vec<&str> = path.split('.').collect();
    let (last_key, parents) = match parts.split_last() {
        Some(split) => split,
        None => return Err(ConfigError::InvalidPath("Empty path".to_string())),
    };

    let mut current = value;
    for (i, part) in parents.iter().enumerate() {
        current = navigate_step_mut(current, part, &parts[..=i])?;
    }

    insert_value(current, last_key, new_value)
}

fn navigate_step_mut<'a>(
    current: &'a mut Value,
    key: &str,
    path_so_far: &[&str],
) -> Result<&'a mut Value, ConfigError> {
    match current {
        Value::Table(table) => Ok(table
            .entry(key.to_string())
            .or_insert_with(|| Value::Table(toml::Table::new()))),
        Value::Array(arr) => {
            let index = key.parse::<usize>().map_err(|_| {
                ConfigError::InvalidPath(format!(
                    "Invalid array index '{}' at path '{}'",
                    key,
                    path_so_far.join(".")
                ))
            })?;

            arr.get_mut(index).ok_or_else(|| {
                ConfigError::InvalidPath(format!(
                    "Array index {} out of bounds at path '{}'",
                    index,
                    path_so_far.join(".")
                ))
            })
        }
        _ => Err(ConfigError::InvalidPath(format!(
            "Cannot navigate into {} at path '{}'",
            current.type_str(),
            path_so_far.join(".")
        ))),
    }
}

fn insert_value(container: &mut Value, key: &str, new_value: Value) -> Result<(), ConfigError> {
    match container {
        Value::Table(table) => {
            table.insert(key.to_string(), new_value);
            Ok(())
        }
        Value::Array(arr) => {
            let index = key
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidPath(format!("Invalid array index '{key}'")))?;

            arr.get_mut(index)
                .map(|elem| *elem = new_value)
                .ok_or_else(|| {
                    ConfigError::InvalidPath(format!("Array index {index} out of bounds"))
                })
        }
        _ => Err(ConfigError::InvalidPath(format!(
            "Cannot insert into {}",
            container.type_str()
        ))),
    }
}
