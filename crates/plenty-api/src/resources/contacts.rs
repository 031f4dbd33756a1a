// Contact endpoints

use crate::client::PlentyClient;
use crate::error::Error;
use crate::pagination::Record;
use crate::query::{Filters, Query, sanitize};
use crate::route::Route;

impl PlentyClient {
    /// Customer and supplier contacts.
    ///
    /// `GET /rest/accounts/contacts`
    pub async fn get_contacts(&self, filters: &Filters) -> Result<Vec<Record>, Error> {
        let query = sanitize(Route::Contacts, Query::new(), filters);
        self.collect_all(Route::Contacts, None, query).await
    }
}
