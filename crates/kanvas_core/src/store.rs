use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::info;

use crate::error::{ChatError, Result};
use crate::model::FaqEntry;

/// Built-in Kanvas Store FAQ set (source: https://kanvas.co.id/).
pub const DEFAULT_FAQS: &[(&str, &str)] = &[
    (
        "Apa itu Kanvas Store?",
        "Kanvas Store adalah platform e-commerce cross-border S2B2C (Supplier to Business to Consumer) terkemuka di Indonesia. Kami menghubungkan supplier berkualitas dengan toko retail offline, menyediakan solusi terintegrasi untuk pembelian dan display produk, membantu toko retail meningkatkan efisiensi dan profitabilitas bisnis.",
    ),
    (
        "Apa itu S2B2C?",
        "S2B2C adalah model bisnis Supplier to Business to Consumer. Kanvas Store menghubungkan supplier dengan toko retail (Business), yang kemudian menjual ke konsumen akhir (Consumer). Platform kami menjadi jembatan antara supplier dan retail melalui platform digital yang efisien.",
    ),
    (
        "Apa layanan yang ditawarkan Kanvas Store?",
        "Kanvas Store menyediakan 3 layanan unggulan: 1) Supplier Network - Akses ke supplier terverifikasi dari dalam dan luar negeri dengan kualitas produk terjamin dan harga kompetitif. 2) Layanan Logistik Terintegrasi - Pengiriman cepat dengan tracking real-time dan layanan after-sales. 3) Dukungan Retail - Solusi lengkap termasuk display management, training & support, dan analisis penjualan.",
    ),
    (
        "Siapa yang bisa menggunakan Kanvas Store?",
        "Kanvas Store diperuntukkan untuk toko retail offline yang ingin meningkatkan efisiensi operasional dan profitabilitas bisnis. Baik toko kecil maupun retail chain bisa bergabung dengan platform kami untuk mendapatkan akses ke supplier berkualitas dan layanan terintegrasi.",
    ),
    (
        "Apa keunggulan Kanvas Store?",
        "Keunggulan Kanvas Store: 1) Platform S2B2C terkemuka dan 100% terpercaya, 2) Layanan One-Stop dari pembelian hingga display management, 3) Fokus pada retail offline, 4) Supplier terverifikasi dengan produk berkualitas, 5) Sistem logistik efisien dengan tracking real-time, 6) Support lengkap untuk meningkatkan penjualan.",
    ),
    (
        "Bagaimana cara bergabung dengan Kanvas Store?",
        "Untuk bergabung dengan Kanvas Store, Anda bisa menghubungi kami melalui email di cs@kanvas.co.id atau telepon di (021) 123-4567. Tim kami akan membantu proses registrasi dan onboarding. Kunjungi website kami di https://kanvas.co.id/ untuk informasi lebih lanjut.",
    ),
    (
        "Di mana lokasi Kanvas Store?",
        "Kanvas Store berlokasi di Jakarta, Indonesia. Namun layanan kami dapat diakses oleh toko retail di seluruh Indonesia. Kami menghubungkan supplier dari dalam dan luar negeri dengan toko retail lokal.",
    ),
    (
        "Bagaimana sistem logistik Kanvas Store?",
        "Kanvas Store menyediakan layanan logistik terintegrasi dengan fitur pengiriman cepat, tracking real-time untuk memantau pesanan, dan layanan after-sales untuk memastikan kepuasan pelanggan. Sistem logistik kami dirancang khusus untuk efisiensi pengiriman produk ke toko retail.",
    ),
    (
        "Apa itu Display Management di Kanvas Store?",
        "Display Management adalah layanan dukungan retail dari Kanvas Store yang membantu toko retail dalam penataan dan display produk di toko. Layanan ini termasuk training & support serta analisis penjualan untuk membantu meningkatkan performa penjualan toko retail.",
    ),
    (
        "Bagaimana cara menghubungi Kanvas Store?",
        "Anda dapat menghubungi Kanvas Store melalui: Email: cs@kanvas.co.id, Telepon: (021) 123-4567. Kami juga memiliki website resmi di https://kanvas.co.id/. Tim customer service kami siap membantu Anda.",
    ),
    (
        "Apakah Kanvas Store menyediakan supplier dari luar negeri?",
        "Ya, Kanvas Store adalah platform e-commerce cross-border, yang artinya kami menyediakan akses ke supplier berkualitas dari dalam dan luar negeri. Semua supplier telah melalui proses verifikasi untuk memastikan kualitas produk terjamin.",
    ),
    (
        "Apa yang dimaksud dengan layanan one-stop?",
        "Layanan one-stop Kanvas Store berarti kami menyediakan solusi lengkap dan terintegrasi mulai dari pembelian produk, logistik pengiriman, hingga penataan display di toko retail. Toko retail tidak perlu menggunakan berbagai platform berbeda, cukup satu platform untuk semua kebutuhan.",
    ),
];

/// Append-only, ordered FAQ collection shared between concurrent callers.
///
/// Appends take the write lock, so a [`KnowledgeStore::snapshot`] never
/// observes a half-applied add.
#[derive(Debug, Default)]
pub struct KnowledgeStore {
    entries: RwLock<Vec<FaqEntry>>,
}

impl KnowledgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<FaqEntry>) -> Self {
        info!(count = entries.len(), "loaded faqs");
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub fn with_default_faqs() -> Self {
        Self::from_entries(
            DEFAULT_FAQS
                .iter()
                .map(|(q, a)| FaqEntry::new(*q, *a))
                .collect(),
        )
    }

    // Pushes are the only mutation; a poisoned lock still holds whole entries.
    fn read(&self) -> RwLockReadGuard<'_, Vec<FaqEntry>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<FaqEntry>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Consistent copy of every entry at a single point in time.
    pub fn snapshot(&self) -> Vec<FaqEntry> {
        self.read().clone()
    }

    pub fn all_entries(&self) -> Vec<FaqEntry> {
        self.snapshot()
    }

    pub fn all_questions(&self) -> Vec<String> {
        self.read().iter().map(|e| e.question.clone()).collect()
    }

    pub fn entry_at(&self, index: usize) -> Result<FaqEntry> {
        let entries = self.read();
        entries.get(index).cloned().ok_or(ChatError::NotFound {
            index,
            len: entries.len(),
        })
    }

    pub fn answer_at(&self, index: usize) -> Result<String> {
        self.entry_at(index).map(|e| e.answer)
    }

    /// Appends a FAQ and returns the index it was stored at.
    pub fn add(&self, question: impl Into<String>, answer: impl Into<String>) -> Result<usize> {
        let entry = FaqEntry::new(question, answer);
        entry.validate()?;

        let mut entries = self.write();
        entries.push(entry);
        let index = entries.len() - 1;
        info!(index, question = %entries[index].question, "added faq");
        Ok(index)
    }
}
