use crate::models::CliApp;

impl CliApp {
    pub fn show_lead_stats(&self) {
        let stats = self.store.stats();
        let manual = self.store.manual_leads().len();
        let workflow = self.store.workflow_leads().len();

        println!("\n📊 Lead Statistics");
        println!("━━━━━━━━━━━━━━━━━━━━━");
        println!("📋 Total leads:        {}", stats.total);
        println!("   ├ manual:           {}", manual);
        println!("   └ workflow:         {}", workflow);
        println!("🎯 Qualified:          {}", stats.qualified);
        println!("🔥 Hot:                {}", stats.hot);
        println!("👥 Personnel on file:  {}", stats.total_personnel);
        println!(
            "🏢 Companies with personnel: {} (avg {:.1} each)",
            stats.companies_with_personnel, stats.avg_personnel_per_company
        );
        if !self.store.has_initial_load() {
            println!("ℹ️  No lead data loaded yet");
        }
    }
}
