//! Guest reviews from the third-party reviews API (Google Places details format).

use serde::Deserialize;

use crate::error::AppError;
use crate::model::content::{Review, ReviewsResponse, Testimonial};

#[derive(Debug, Deserialize)]
struct PlaceDetails {
    #[serde(default)]
    result: Option<PlaceResult>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    rating: Option<f32>,
    user_ratings_total: Option<i64>,
    #[serde(default)]
    reviews: Vec<PlaceReview>,
}

#[derive(Debug, Deserialize)]
struct PlaceReview {
    author_name: String,
    rating: f32,
    #[serde(default)]
    text: String,
    relative_time_description: Option<String>,
    profile_photo_url: Option<String>,
}

pub async fn fetch_external(client: &reqwest::Client, url: &str) -> Result<ReviewsResponse, AppError> {
    let upstream = |message: String| AppError::Upstream {
        service: "Reviews API",
        message,
    };

    let resp = client.get(url).send().await.map_err(|e| upstream(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(upstream(format!("returned {}", resp.status())));
    }
    let body = resp.text().await.map_err(|e| upstream(e.to_string()))?;
    parse_place_details(&body).map_err(upstream)
}

fn parse_place_details(body: &str) -> Result<ReviewsResponse, String> {
    let details: PlaceDetails = serde_json::from_str(body).map_err(|e| format!("unreadable response: {e}"))?;

    if let Some(status) = details.status.as_deref() {
        if status != "OK" {
            return Err(format!("status {status}"));
        }
    }

    let result = details.result.ok_or_else(|| "response has no result".to_string())?;
    let reviews = result
        .reviews
        .into_iter()
        .map(|r| Review {
            author: r.author_name,
            rating: r.rating,
            text: r.text,
            relative_time: r.relative_time_description,
            profile_photo_url: r.profile_photo_url,
        })
        .collect();

    Ok(ReviewsResponse {
        source: "external",
        rating: result.rating,
        total_ratings: result.user_ratings_total,
        reviews,
    })
}

/// Same shape built from approved testimonials, used when no reviews API is configured.
pub fn from_testimonials(testimonials: Vec<Testimonial>) -> ReviewsResponse {
    let total = testimonials.len() as i64;
    let rating = if testimonials.is_empty() {
        None
    } else {
        let sum: i32 = testimonials.iter().map(|t| t.rating).sum();
        Some(((sum as f32 / total as f32) * 10.0).round() / 10.0)
    };

    let reviews = testimonials
        .into_iter()
        .map(|t| Review {
            author: t.guest_name,
            rating: t.rating as f32,
            text: t.content,
            relative_time: None,
            profile_photo_url: None,
        })
        .collect();

    ReviewsResponse {
        source: "testimonials",
        rating,
        total_ratings: Some(total),
        reviews,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn normalizes_place_details() {
        let body = r#"{
            "status": "OK",
            "result": {
                "rating": 4.6,
                "user_ratings_total": 312,
                "reviews": [
                    {"author_name": "Meera", "rating": 5, "text": "Lovely pool", "relative_time_description": "a month ago"},
                    {"author_name": "Sam", "rating": 4, "profile_photo_url": "https://img/sam.png"}
                ]
            }
        }"#;

        let parsed = parse_place_details(body).unwrap();
        assert_eq!(parsed.source, "external");
        assert_eq!(parsed.total_ratings, Some(312));
        assert_eq!(parsed.reviews.len(), 2);
        assert_eq!(parsed.reviews[0].relative_time.as_deref(), Some("a month ago"));
        assert_eq!(parsed.reviews[1].text, "");
    }

    #[test]
    fn error_status_is_reported() {
        let err = parse_place_details(r#"{"status": "REQUEST_DENIED"}"#).unwrap_err();
        assert!(err.contains("REQUEST_DENIED"));
    }

    #[test]
    fn testimonials_are_averaged() {
        let make = |rating| Testimonial {
            id: Uuid::new_v4(),
            guest_name: "Guest".to_string(),
            location: None,
            rating,
            content: "Wonderful stay".to_string(),
            is_approved: true,
            created_at: Utc::now(),
        };
        let resp = from_testimonials(vec![make(5), make(4), make(4)]);
        assert_eq!(resp.source, "testimonials");
        assert_eq!(resp.rating, Some(4.3));
        assert_eq!(resp.reviews.len(), 3);

        assert_eq!(from_testimonials(vec![]).rating, None);
    }
}
