//! Appointment list: status filter, free-text search and either paged or
//! scrolling presentation over the same filtered data.

use barberia_agenda::{
    wire::{CitaDetalle, Mensaje},
    AppointmentStatus, Role,
};
use std::str::FromStr;

use crate::api::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Todos,
    Solo(AppointmentStatus),
}

impl StatusFilter {
    pub fn matches(self, estado: AppointmentStatus) -> bool {
        match self {
            StatusFilter::Todos => true,
            StatusFilter::Solo(wanted) => wanted == estado,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("todos") {
            return Ok(StatusFilter::Todos);
        }
        s.parse::<AppointmentStatus>()
            .map(StatusFilter::Solo)
            .map_err(ClientError::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewport {
    Mobile,
    Tablet,
    Desktop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    Paged { page_size: usize },
    Scroll,
}

impl Layout {
    /// Mobile scrolls through everything; larger screens page, four cards
    /// at a time for clients and six for staff.
    pub fn for_viewport(role: Role, viewport: Viewport) -> Self {
        match viewport {
            Viewport::Mobile => Layout::Scroll,
            Viewport::Tablet | Viewport::Desktop if role.is_staff() => Layout::Paged { page_size: 6 },
            Viewport::Tablet | Viewport::Desktop => Layout::Paged { page_size: 4 },
        }
    }
}

/// Proof that the user was asked to confirm cancelling `id`.
#[derive(Debug, PartialEq, Eq)]
pub struct PendingCancel {
    id: i64,
}

impl PendingCancel {
    pub fn id(&self) -> i64 {
        self.id
    }
}

/// A cancellation the server accepted, plus how the follow-up refetch went.
#[derive(Debug)]
pub struct CancelOutcome {
    pub mensaje: Mensaje,
    pub refresh: Result<(), ClientError>,
}

#[derive(Debug)]
pub struct AppointmentBoard {
    citas: Vec<CitaDetalle>,
    filter: StatusFilter,
    search: String,
    layout: Layout,
    page: usize,
}

impl AppointmentBoard {
    pub fn new(layout: Layout) -> Self {
        Self {
            citas: Vec::new(),
            filter: StatusFilter::Todos,
            search: String::new(),
            layout,
            page: 0,
        }
    }

    /// Swap in a freshly fetched list, keeping filters and clamping the page.
    pub fn replace(&mut self, citas: Vec<CitaDetalle>) {
        self.citas = citas;
        self.page = self.page.min(self.page_count().saturating_sub(1));
    }

    pub async fn refresh(&mut self, api: &ApiClient) -> Result<(), ClientError> {
        let citas = api.listar_citas().await?;
        self.replace(citas);
        Ok(())
    }

    pub fn set_filter(&mut self, filter: StatusFilter) {
        self.filter = filter;
        self.page = 0;
    }

    pub fn set_search(&mut self, search: &str) {
        self.search = search.trim().to_lowercase();
        self.page = 0;
    }

    pub fn set_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.page = 0;
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    fn matches_search(&self, cita: &CitaDetalle) -> bool {
        if self.search.is_empty() {
            return true;
        }
        [
            cita.barbero_nombre.as_str(),
            cita.paciente_nombre.as_str(),
            cita.servicio_nombre.as_str(),
            cita.estado.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&self.search))
    }

    /// Status filter first, then search.
    pub fn filtered(&self) -> Vec<&CitaDetalle> {
        self.citas
            .iter()
            .filter(|c| self.filter.matches(c.estado))
            .filter(|c| self.matches_search(c))
            .collect()
    }

    pub fn page_count(&self) -> usize {
        match self.layout {
            Layout::Paged { page_size } => self.filtered().len().div_ceil(page_size.max(1)).max(1),
            Layout::Scroll => 1,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    /// What is on screen: one page, or the whole filtered list when scrolling.
    pub fn visible(&self) -> Vec<&CitaDetalle> {
        let filtered = self.filtered();
        match self.layout {
            Layout::Paged { page_size } => {
                let size = page_size.max(1);
                filtered.into_iter().skip(self.page * size).take(size).collect()
            }
            Layout::Scroll => filtered,
        }
    }

    pub fn next_page(&mut self) -> bool {
        if self.page + 1 < self.page_count() {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev_page(&mut self) -> bool {
        if self.page > 0 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    /// The cancel action is offered only for pending or confirmed appointments.
    pub fn can_cancel(&self, id: i64) -> bool {
        self.citas
            .iter()
            .any(|c| c.id == id && c.estado.is_cancellable())
    }

    /// First half of a cancellation: the caller shows a confirmation and
    /// passes the token to [`AppointmentBoard::confirm_cancel`].
    pub fn request_cancel(&self, id: i64) -> Result<PendingCancel, ClientError> {
        if !self.can_cancel(id) {
            return Err(ClientError::Validation(
                "Solo se pueden cancelar citas pendientes o confirmadas".into(),
            ));
        }
        Ok(PendingCancel { id })
    }

    /// Send the cancellation, then refetch the whole list. A failed
    /// cancellation leaves the list untouched. Once the server has
    /// cancelled, the outcome is `Ok` even if the refetch fails; that
    /// failure is reported in [`CancelOutcome::refresh`] and the list keeps
    /// its previous contents.
    pub async fn confirm_cancel(
        &mut self,
        pending: PendingCancel,
        api: &ApiClient,
        zona_horaria: &str,
    ) -> Result<CancelOutcome, ClientError> {
        let mensaje = api.cancelar_cita(pending.id, zona_horaria).await?;
        let refresh = self.refresh(api).await;
        if let Err(e) = &refresh {
            tracing::warn!("appointment {} cancelled but the list could not be reloaded: {}", pending.id, e);
        }
        Ok(CancelOutcome { mensaje, refresh })
    }
}
