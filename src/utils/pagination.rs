//! Spring-style paging parameters: `?page=0&size=20&sort=name,desc&sort=id`.

use crate::config::PagingConfig;
use crate::errors::AppError;
use crate::models::page::{Direction, PageRequest, Sort};

#[derive(Debug, Default, PartialEq)]
pub struct PageParams {
    page: Option<String>,
    size: Option<String>,
    sort: Vec<String>,
}

impl PageParams {
    pub fn parse(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "page" => params.page = Some(value.into_owned()),
                "size" => params.size = Some(value.into_owned()),
                "sort" => params.sort.push(value.into_owned()),
                _ => {}
            }
        }
        params
    }

    /// Validates the parameters against the paging limits and the entity's
    /// sortable properties, given as `(json name, column)` pairs.
    pub fn into_request(
        self,
        sortable: &[(&str, &'static str)],
        config: &PagingConfig,
    ) -> Result<PageRequest, AppError> {
        let page = match self.page {
            None => 0,
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .map_err(|_| AppError::BadRequest(format!("invalid page index: {}", raw)))?,
        };

        let size = match self.size {
            None => config.default_size,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(size) if size > 0 && size <= config.max_size => size,
                _ => {
                    return Err(AppError::BadRequest(format!(
                        "page size must be between 1 and {}: {}",
                        config.max_size, raw
                    )))
                }
            },
        };

        let mut request = PageRequest::new(page, size);
        for raw in &self.sort {
            for sort in parse_sort(raw, sortable)? {
                request = request.sorted_by(sort.column, sort.direction);
            }
        }
        Ok(request)
    }
}

/// Parses one `sort` value: one or more properties, optionally followed by
/// a direction that applies to all of them.
fn parse_sort(raw: &str, sortable: &[(&str, &'static str)]) -> Result<Vec<Sort>, AppError> {
    let mut parts: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    let direction = match parts.last().map(|part| part.to_ascii_lowercase()) {
        Some(last) if last == "asc" => {
            parts.pop();
            Direction::Asc
        }
        Some(last) if last == "desc" => {
            parts.pop();
            Direction::Desc
        }
        _ => Direction::Asc,
    };

    parts
        .into_iter()
        .map(|property| {
            sortable
                .iter()
                .find(|(name, _)| *name == property)
                .map(|(_, column)| Sort {
                    column: *column,
                    direction,
                })
                .ok_or_else(|| AppError::BadRequest(format!("cannot sort by `{}`", property)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{department, employee};

    fn request(query: &str) -> Result<PageRequest, AppError> {
        PageParams::parse(query).into_request(department::SORTABLE, &PagingConfig::default())
    }

    #[test]
    fn defaults_apply_without_parameters() {
        assert_eq!(request("").unwrap(), PageRequest::new(0, 20));
    }

    #[test]
    fn reads_page_size_and_repeated_sorts() {
        let request = request("page=2&size=5&sort=name,desc&sort=id").unwrap();
        assert_eq!(
            request,
            PageRequest::new(2, 5)
                .sorted_by("name", Direction::Desc)
                .sorted_by("id", Direction::Asc)
        );
    }

    #[test]
    fn direction_applies_to_every_listed_property() {
        let request = PageParams::parse("sort=lastName,firstName,DESC")
            .into_request(employee::SORTABLE, &PagingConfig::default())
            .unwrap();
        assert_eq!(
            request.sort,
            vec![
                Sort {
                    column: "last_name",
                    direction: Direction::Desc
                },
                Sort {
                    column: "first_name",
                    direction: Direction::Desc
                },
            ]
        );
    }

    #[test]
    fn rejects_bad_page_and_size() {
        for query in ["page=-1", "page=x", "size=0", "size=101", "size=-3", "size=big"] {
            assert!(
                matches!(request(query), Err(AppError::BadRequest(_))),
                "{} accepted",
                query
            );
        }
    }

    #[test]
    fn rejects_unknown_sort_property() {
        let err = request("sort=salary,desc").unwrap_err();
        assert_eq!(err.to_string(), "Bad Request: cannot sort by `salary`");

        // column names are not accepted in place of property names
        assert!(request("sort=created_at").is_err());
    }

    #[test]
    fn percent_encoded_values_are_decoded() {
        let request = request("sort=createdAt%2Cdesc").unwrap();
        assert_eq!(
            request.sort,
            vec![Sort {
                column: "created_at",
                direction: Direction::Desc
            }]
        );
    }
}
