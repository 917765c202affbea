use crate::models::{Keywords, Report, TrendResult};

/// Results of the latest submissions for one user.
///
/// Each successful submission replaces its field wholesale. A failed
/// submission leaves whatever was there before.
#[derive(Debug, Default)]
pub struct Session {
    pub last_trend: Option<TrendResult>,
    pub last_keywords: Option<Keywords>,
    pub last_report: Option<Report>,
    pub last_social_post: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Session::default()
    }

    pub fn record_trend(&mut self, trend: TrendResult) {
        self.last_trend = Some(trend);
    }

    /// A new report invalidates the social post written for the old one.
    pub fn record_report(&mut self, keywords: Keywords, report: Report) {
        self.last_keywords = Some(keywords);
        self.last_report = Some(report);
        self.last_social_post = None;
    }

    pub fn record_social_post(&mut self, post: String) {
        self.last_social_post = Some(post);
    }

    pub fn is_empty(&self) -> bool {
        self.last_trend.is_none() && self.last_report.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportEntry, SearchTerm, Summary};
    use chrono::NaiveDate;

    fn report(title: &str) -> Report {
        Report {
            header: "header".into(),
            entries: vec![ReportEntry {
                title: title.into(),
                summary: Ok(Summary("s".into())),
            }],
        }
    }

    #[test]
    fn later_submissions_replace_earlier_ones() {
        let mut session = Session::new();
        assert!(session.is_empty());

        session.record_trend(TrendResult {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            terms: vec![SearchTerm("eclipse".into())],
        });
        session.record_report(Keywords::parse(["fashion"]).unwrap(), report("first"));
        session.record_social_post("post".into());
        session.record_report(Keywords::parse(["shoes"]).unwrap(), report("second"));

        assert!(!session.is_empty());
        assert_eq!(session.last_report.as_ref().unwrap().entries[0].title, "second");
        assert_eq!(session.last_keywords.as_ref().unwrap().joined(), "shoes");
        assert!(session.last_social_post.is_none());
        assert_eq!(session.last_trend.as_ref().unwrap().terms.len(), 1);
    }
}
