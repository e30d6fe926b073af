use region_compliance_core::verdict::InstanceReservation;

pub trait InventoryService {
    fn list_regions(&self) -> Result<Vec<String>, String>;
    fn list_instance_reservations(&self, region: &str) -> Result<Vec<InstanceReservation>, String>;
}
